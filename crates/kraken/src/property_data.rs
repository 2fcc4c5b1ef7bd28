//! Client for the Street Group Property Data API.
//!
//! A lookup never fails from the caller's point of view: every error is folded
//! into a string starting with [`ERROR_PREFIX`] so it can be handed to the
//! model as ordinary tool output.
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const PROPERTY_DATA_HOST: &str = "https://api.data.street.co.uk";
pub const ERROR_PREFIX: &str = "Error fetching property details: ";
pub const FIELDS_PARAM: &str = "fields[property]";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Every property field the API knows about, requested on each lookup unless overridden
pub const DEFAULT_FIELDS: &str = concat!(
    "address,airport_noise,assets,coastal_erosion,connectivity,",
    "construction_age_band,construction_materials,council_tax,education,",
    "energy_performance,estimated_rental_values,estimated_value,",
    "estimated_value_rounded,estimated_values,flood_risk,hmo,identities,",
    "internal_area_square_metres,is_bungalow,is_on_the_market,",
    "latest_transaction_date,listed_buildings_on_plot,localities,location,",
    "market_statistics,nearby_completed_transactions,nearby_listed_buildings,",
    "nearby_listings,nearby_planning_applications,number_of_bathrooms,",
    "number_of_bedrooms,occupancy,outdoor_space,ownership,planning_applications,",
    "plot,propensity_to_let_score,propensity_to_sell_score,property_listings,",
    "property_type,restrictive_covenants,right_of_way,radon_risk_level,",
    "nearby_scheduled_monuments,street_group_property_id,street_view,tenure,",
    "title_deeds,transactions,transport,utilities,year_built",
);

#[derive(Error, Debug)]
enum PropertyDataError {
    #[error("property identifier must not be empty")]
    EmptyPropertyId,

    #[error("invalid property data host: {0}")]
    InvalidHost(String),

    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("{0}")]
    Transport(String),

    #[error("invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),
}

// The reqwest message embeds the full request URL, so only the kind of failure is kept
impl From<reqwest::Error> for PropertyDataError {
    fn from(err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "could not connect to the property data API"
        } else if err.is_builder() {
            "could not build the request"
        } else if err.is_body() || err.is_decode() {
            "could not read the response body"
        } else {
            "request failed"
        };
        PropertyDataError::Transport(reason.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDataConfig {
    pub host: String,
    pub api_key: String,
    /// Comma separated field names sent as `fields[property]`
    pub fields: String,
    pub timeout: Duration,
}

impl PropertyDataConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: PROPERTY_DATA_HOST.to_string(),
            api_key: api_key.into(),
            fields: DEFAULT_FIELDS.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: S) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fetches property records. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PropertyDataClient {
    client: Client,
    config: PropertyDataConfig,
}

impl PropertyDataClient {
    pub fn new(config: PropertyDataConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PropertyDataConfig {
        &self.config
    }

    /// A client sharing this one's connection pool but requesting other fields
    pub fn with_fields<S: Into<String>>(&self, fields: S) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone().with_fields(fields),
        }
    }

    /// Fetch a property with the configured field selection
    pub async fn lookup(&self, property_id: &str) -> String {
        self.lookup_with_fields(property_id, &self.config.fields)
            .await
    }

    /// Fetch a property and return its `data` member serialized as JSON,
    /// or an error string starting with [`ERROR_PREFIX`].
    pub async fn lookup_with_fields(&self, property_id: &str, fields: &str) -> String {
        match self.fetch(property_id, fields).await {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(property_id, error = %err, "property lookup failed");
                format!("{}{}", ERROR_PREFIX, err)
            }
        }
    }

    fn property_url(&self, property_id: &str) -> Result<Url, PropertyDataError> {
        if property_id.is_empty() {
            return Err(PropertyDataError::EmptyPropertyId);
        }

        let mut url = Url::parse(&self.config.host)
            .map_err(|e| PropertyDataError::InvalidHost(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PropertyDataError::InvalidHost(self.config.host.clone()))?
            .pop_if_empty()
            .extend(["property-data", "properties", property_id]);
        Ok(url)
    }

    async fn fetch(&self, property_id: &str, fields: &str) -> Result<String, PropertyDataError> {
        let url = self.property_url(property_id)?;
        tracing::debug!(%url, "fetching property details");

        let response = self
            .client
            .get(url)
            .header("x-api-key", self.config.api_key.as_str())
            .header("key", self.config.api_key.as_str())
            .query(&[(FIELDS_PARAM, fields)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PropertyDataError::Status(status));
        }

        let body = response.text().await?;
        let mut payload: Value = serde_json::from_str(&body)?;

        // A payload without `data` serializes as `null`
        let data = payload
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok(serde_json::to_string(&data)?)
    }
}
