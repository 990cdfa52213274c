// airtable.rs
use reqwest::blocking::{Client, Response};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use super::{Collection, Page, PageOptions, RawRecord, RemoteSource, SourceError};

const API_ROOT: &str = "https://api.airtable.com/v0/";
const USER_AGENT: &str = concat!("staffing-match/", env!("CARGO_PKG_VERSION"));

/// Remote table names, one per collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableTables {
    pub candidates: String,
    pub facilities: String,
    pub needs: String,
    pub candidate_tags: String,
    pub tracking: String,
    pub configuration: String,
}

impl Default for AirtableTables {
    fn default() -> Self {
        Self {
            candidates: "Candidates".into(),
            facilities: "Authorized Facilities".into(),
            needs: "Facility Staffing Needs".into(),
            candidate_tags: "Candidate Tags".into(),
            tracking: "Mailing Tracking".into(),
            configuration: "Configuration".into(),
        }
    }
}

impl AirtableTables {
    pub fn name(&self, collection: Collection) -> &str {
        match collection {
            Collection::Candidates => &self.candidates,
            Collection::Facilities => &self.facilities,
            Collection::Needs => &self.needs,
            Collection::CandidateTags => &self.candidate_tags,
            Collection::Tracking => &self.tracking,
            Collection::Configuration => &self.configuration,
        }
    }
}

/// Blocking client for the Airtable REST API.
pub struct AirtableSource {
    client: Client,
    api_key: String,
    base_id: String,
    endpoint: Url,
    tables: AirtableTables,
    page_delay: Duration,
}

impl AirtableSource {
    pub fn new(
        api_key: impl Into<String>,
        base_id: impl Into<String>,
        tables: AirtableTables,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let endpoint = Url::parse(API_ROOT).map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_id: base_id.into(),
            endpoint,
            tables,
            page_delay: Duration::ZERO,
        })
    }

    /// Point at a different API root (proxies, recorded fixtures).
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, SourceError> {
        self.endpoint = Url::parse(endpoint).map_err(|e| SourceError::Config(e.to_string()))?;
        Ok(self)
    }

    /// Pause between consecutive pages to stay under the API rate limit.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    fn table_url(&self, collection: Collection, record_id: Option<&str>) -> Result<Url, SourceError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SourceError::Config(format!("cannot-be-a-base endpoint: {}", self.endpoint)))?;
            segments
                .pop_if_empty()
                .push(&self.base_id)
                .push(self.tables.name(collection));
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn read_body(resp: Response) -> Result<String, SourceError> {
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn page_url(&self, collection: Collection, offset: Option<&str>, options: &PageOptions) -> Result<Url, SourceError> {
        let mut url = self.table_url(collection, None)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(size) = options.page_size {
                query.append_pair("pageSize", &size.to_string());
            }
            if let Some(view) = options.view.as_deref() {
                query.append_pair("view", view);
            }
            if let Some(offset) = offset {
                query.append_pair("offset", offset);
            }
        }
        Ok(url)
    }
}

pub(crate) fn decode_page(body: &str) -> Result<Page, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))
}

impl RemoteSource for AirtableSource {
    fn fetch_page(
        &self,
        collection: Collection,
        offset: Option<&str>,
        options: &PageOptions,
    ) -> Result<Page, SourceError> {
        if offset.is_some() && !self.page_delay.is_zero() {
            std::thread::sleep(self.page_delay);
        }

        let url = self.page_url(collection, offset, options)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        decode_page(&Self::read_body(resp)?)
    }

    fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<(), SourceError> {
        let url = self.table_url(collection, Some(id))?;
        let resp = self
            .client
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Self::read_body(resp)?;
        Ok(())
    }

    fn create(&self, collection: Collection, fields: Map<String, Value>) -> Result<String, SourceError> {
        let url = self.table_url(collection, None)?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let body = Self::read_body(resp)?;
        let created: RawRecord =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> AirtableSource {
        AirtableSource::new("key", "appBase", AirtableTables::default()).unwrap()
    }

    #[test]
    fn table_names_are_path_encoded() {
        let url = source().table_url(Collection::Facilities, None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.airtable.com/v0/appBase/Authorized%20Facilities"
        );

        let url = source().table_url(Collection::Facilities, Some("recF1")).unwrap();
        assert!(url.as_str().ends_with("/Authorized%20Facilities/recF1"));
    }

    #[test]
    fn page_url_carries_options_and_offset() {
        let options = PageOptions {
            page_size: Some(100),
            view: Some("Grid view".into()),
        };
        let url = source()
            .page_url(Collection::Needs, Some("itr123/rec9"), &options)
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("pageSize".to_string(), "100".to_string()),
                ("view".to_string(), "Grid view".to_string()),
                ("offset".to_string(), "itr123/rec9".to_string()),
            ]
        );
    }

    #[test]
    fn custom_endpoint_keeps_its_prefix() {
        let src = source().with_endpoint("http://localhost:8080/airtable/v0/").unwrap();
        let url = src.table_url(Collection::Tracking, None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/airtable/v0/appBase/Mailing%20Tracking");
    }

    #[test]
    fn decodes_pages() {
        let page = decode_page(
            r#"{
                "records": [
                    {"id": "rec1", "createdTime": "2020-04-01T00:00:00.000Z", "fields": {"Name": "A"}},
                    {"id": "rec2", "createdTime": "2020-04-01T00:00:00.000Z"}
                ],
                "offset": "itrX/rec2"
            }"#,
        )
        .unwrap();

        assert_eq!(page.records.len(), 2);
        assert!(page.records[1].fields.is_empty());
        assert_eq!(page.offset.as_deref(), Some("itrX/rec2"));

        let last = decode_page(r#"{"records": []}"#).unwrap();
        assert!(last.offset.is_none());

        assert!(matches!(decode_page("<html>"), Err(SourceError::Decode(_))));
    }
}
