use dotenvy::dotenv;
use std::{collections::HashMap, env};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    /// Cashbook lives in its own database when set; otherwise it shares `database_url`.
    pub cashbook_database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Serial numbers of biometric devices allowed to push punches. Empty accepts any device.
    pub device_serials: Vec<String>,
    /// Company each device enrolls cards for, from `SERIAL=Company Name` entries
    pub device_companies: HashMap<String, String>,
    /// UTC offset in hours sent to devices during the push handshake
    pub device_timezone: i32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let devices = env::var("DEVICE_SERIALS").unwrap_or_default();

        Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a valid port number"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            cashbook_database_url: env::var("CASHBOOK_DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("DB_MAX_CONNECTIONS must be a number"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRY_HOURS must be a number"),
            device_serials: parse_serials(&devices),
            device_companies: parse_device_companies(&devices),
            device_timezone: env::var("DEVICE_TIMEZONE")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .expect("DEVICE_TIMEZONE must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn accepts_device(&self, serial: &str) -> bool {
        self.device_serials.is_empty() || self.device_serials.iter().any(|s| s == serial)
    }

    pub fn device_company(&self, serial: &str) -> Option<&str> {
        self.device_companies.get(serial).map(String::as_str)
    }
}

/// `DEVICE_SERIALS` entries are `SERIAL` or `SERIAL=Company Name`
fn device_entries(raw: &str) -> impl Iterator<Item = (&str, Option<&str>)> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((serial, company)) => {
                let company = company.trim();
                (serial.trim(), (!company.is_empty()).then_some(company))
            }
            None => (entry, None),
        })
        .filter(|(serial, _)| !serial.is_empty())
}

fn parse_serials(raw: &str) -> Vec<String> {
    device_entries(raw).map(|(serial, _)| serial.to_string()).collect()
}

fn parse_device_companies(raw: &str) -> HashMap<String, String> {
    device_entries(raw)
        .filter_map(|(serial, company)| Some((serial.to_string(), company?.to_string())))
        .collect()
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 3000,
        database_url: "postgres://localhost/factory_erp_test".to_string(),
        cashbook_database_url: None,
        db_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_hours: 1,
        device_serials: vec!["CKJ1234567".to_string()],
        device_companies: HashMap::from([("CKJ1234567".to_string(), "Alpha Knit".to_string())]),
        device_timezone: 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_list_ignores_blanks() {
        assert_eq!(parse_serials(" A1 , ,B2,"), vec!["A1", "B2"]);
        assert!(parse_serials("").is_empty());
    }

    #[test]
    fn serials_may_name_their_company() {
        let raw = "CKJ1, BETA-DEVICE = Beta Garments ,GAMMA=";
        assert_eq!(parse_serials(raw), vec!["CKJ1", "BETA-DEVICE", "GAMMA"]);

        let companies = parse_device_companies(raw);
        assert_eq!(companies.len(), 1);
        assert_eq!(companies["BETA-DEVICE"], "Beta Garments");

        let config = test_config();
        assert_eq!(config.device_company("CKJ1234567"), Some("Alpha Knit"));
        assert_eq!(config.device_company("OTHER"), None);
    }

    #[test]
    fn empty_serial_list_accepts_any_device() {
        let mut config = test_config();
        assert!(config.accepts_device("CKJ1234567"));
        assert!(!config.accepts_device("OTHER"));
        config.device_serials.clear();
        assert!(config.accepts_device("OTHER"));
    }
}
