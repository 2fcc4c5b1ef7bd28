use kraken::agent::Agent;
use kraken::property_data::PropertyDataClient;
use kraken::property_system::PropertySystem;
use kraken::providers::base::Provider;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub property_data: PropertyDataClient,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, property_data: PropertyDataClient) -> Self {
        Self {
            provider,
            property_data,
        }
    }

    /// Build an agent for one request, optionally requesting a different field selection
    pub fn agent(&self, fields: Option<&str>) -> Agent {
        let client = match fields {
            Some(fields) => self.property_data.with_fields(fields),
            None => self.property_data.clone(),
        };

        let mut agent = Agent::new(self.provider.clone());
        agent.add_system(Box::new(PropertySystem::new(client)));
        agent
    }
}
