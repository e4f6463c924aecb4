/// Broker connection settings
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl BrokerConfig {
    pub const DEFAULT_PORT: u16 = 5672;

    /// AMQP URI for the default virtual host
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.port
        )
    }
}
