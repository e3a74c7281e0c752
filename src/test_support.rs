use crate::config::Config;

pub fn config(authority_host: &str, crm_url: &str) -> Config {
    Config {
        tenant_id: "test-tenant".to_string(),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        crm_url: crm_url.to_string(),
        port: 8080,
        authority_host: authority_host.to_string(),
        crm_api_version: "v9.0".to_string(),
        crm_timeout_secs: 5,
        parent_link_ttl_secs: 3600,
        rollback_on_link_failure: true,
        rate_limit_per_second: 10,
        rate_limit_burst: 20,
    }
}
