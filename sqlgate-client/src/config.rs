//! Connection properties and data-source configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sqlgate_core::{Result, SqlGateError};

/// Default server port.
const DEFAULT_PORT: u16 = 1543;
/// Default login timeout.
const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Well-known connection property keys.
pub mod keys {
    /// The server host name.
    pub const SERVER_NAME: &str = "serverName";
    /// The server port.
    pub const PORT_NUMBER: &str = "portNumber";
    /// The database to connect to.
    pub const DATABASE_NAME: &str = "databaseName";
    /// The login user.
    pub const USER: &str = "user";
    /// The login password.
    pub const PASSWORD: &str = "password";
    /// A client-supplied application name, for server-side diagnostics.
    pub const APPLICATION_NAME: &str = "applicationName";
    /// Whether string parameters are transmitted in the server's universal
    /// (unicode) encoding.
    pub const SEND_STRING_PARAMETERS_AS_UNICODE: &str = "sendStringParametersAsUnicode";
    /// The result-set materialization strategy hint for application queries.
    pub const SELECT_METHOD: &str = "selectMethod";
    /// Session establishment timeout, in seconds.
    pub const LOGIN_TIMEOUT: &str = "loginTimeout";
}

/// The resolved property set of a session.
///
/// A session is established from a flat string-keyed property set, the same
/// shape the textual connection string decomposes into. Well-known keys are
/// listed in [`keys`]; unknown keys pass through untouched so the session
/// layer can consume extensions this crate does not know about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProperties {
    entries: BTreeMap<String, String>,
}

impl ConnectionProperties {
    /// Creates an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `key=value;key=value` connection string.
    ///
    /// Empty segments are ignored; a segment without `=` is rejected.
    pub fn from_connection_string(s: &str) -> Result<Self> {
        let mut props = Self::new();
        for segment in s.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                SqlGateError::Configuration(format!(
                    "malformed connection string segment: {:?}",
                    segment
                ))
            })?;
            props.set(key.trim(), value.trim());
        }
        Ok(props)
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes `key`, returning its previous value if any.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the server name, if set.
    pub fn server_name(&self) -> Option<&str> {
        self.get(keys::SERVER_NAME)
    }

    /// Returns the server port, if set and well-formed.
    pub fn port_number(&self) -> Option<u16> {
        self.get(keys::PORT_NUMBER).and_then(|v| v.parse().ok())
    }

    /// Returns the database name, if set.
    pub fn database_name(&self) -> Option<&str> {
        self.get(keys::DATABASE_NAME)
    }

    /// Returns whether string parameters are sent in the universal encoding.
    ///
    /// Absent means the session layer's negotiated default.
    pub fn send_string_parameters_as_unicode(&self) -> Option<bool> {
        self.get(keys::SEND_STRING_PARAMETERS_AS_UNICODE)
            .map(|v| v.eq_ignore_ascii_case("true"))
    }
}

impl FromIterator<(String, String)> for ConnectionProperties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Derives the property set for a control connection from the physical
/// connection's resolved properties.
///
/// Coordinator stored procedures return their output parameters in the
/// server's universal string encoding regardless of what the physical
/// session negotiated, so the unicode-parameter flag is forced on. The
/// select-method hint only affects result-set materialization for
/// application queries and is meaningless for a session that never opens an
/// application cursor, so it is stripped. Every other property, including
/// server, port, database, and credentials, is carried over unchanged.
pub fn derive_control_properties(physical: &ConnectionProperties) -> ConnectionProperties {
    let mut control = physical.clone();
    control.set(keys::SEND_STRING_PARAMETERS_AS_UNICODE, "true");
    control.remove(keys::SELECT_METHOD);
    control
}

/// Configuration for a data source.
///
/// Resolved into a [`ConnectionProperties`] set when a session is
/// established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    server_name: String,
    port_number: u16,
    database_name: String,
    user: Option<String>,
    password: Option<String>,
    application_name: Option<String>,
    send_string_parameters_as_unicode: Option<bool>,
    select_method: Option<String>,
    login_timeout: Duration,
}

impl DataSourceConfig {
    /// Returns a new configuration builder.
    pub fn builder() -> DataSourceConfigBuilder {
        DataSourceConfigBuilder::new()
    }

    /// Returns the server host name.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Returns the server port.
    pub fn port_number(&self) -> u16 {
        self.port_number
    }

    /// Returns the database name.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Returns the configured login user, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the configured password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the application name, if any.
    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    /// Returns the session establishment timeout.
    pub fn login_timeout(&self) -> Duration {
        self.login_timeout
    }

    /// Resolves this configuration into a connection property set.
    ///
    /// `user` and `password` override the configured credentials when given;
    /// absent credentials are omitted entirely (integrated authentication).
    pub fn to_properties(
        &self,
        user: Option<&str>,
        password: Option<&str>,
    ) -> ConnectionProperties {
        let mut props = ConnectionProperties::new();
        props.set(keys::SERVER_NAME, &self.server_name);
        props.set(keys::PORT_NUMBER, self.port_number.to_string());
        props.set(keys::DATABASE_NAME, &self.database_name);
        if let Some(user) = user.or(self.user.as_deref()) {
            props.set(keys::USER, user);
        }
        if let Some(password) = password.or(self.password.as_deref()) {
            props.set(keys::PASSWORD, password);
        }
        if let Some(app) = &self.application_name {
            props.set(keys::APPLICATION_NAME, app);
        }
        if let Some(unicode) = self.send_string_parameters_as_unicode {
            props.set(keys::SEND_STRING_PARAMETERS_AS_UNICODE, unicode.to_string());
        }
        if let Some(method) = &self.select_method {
            props.set(keys::SELECT_METHOD, method);
        }
        props.set(
            keys::LOGIN_TIMEOUT,
            self.login_timeout.as_secs().to_string(),
        );
        props
    }
}

/// Builder for [`DataSourceConfig`].
#[derive(Debug, Clone, Default)]
pub struct DataSourceConfigBuilder {
    server_name: Option<String>,
    port_number: Option<u16>,
    database_name: Option<String>,
    user: Option<String>,
    password: Option<String>,
    application_name: Option<String>,
    send_string_parameters_as_unicode: Option<bool>,
    select_method: Option<String>,
    login_timeout: Option<Duration>,
}

impl DataSourceConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server host name.
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Sets the server port.
    pub fn port_number(mut self, port: u16) -> Self {
        self.port_number = Some(port);
        self
    }

    /// Sets the database name.
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Sets the login credentials.
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the application name reported to the server.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets whether string parameters are transmitted in the server's
    /// universal (unicode) encoding.
    pub fn send_string_parameters_as_unicode(mut self, enabled: bool) -> Self {
        self.send_string_parameters_as_unicode = Some(enabled);
        self
    }

    /// Sets the result-set materialization strategy hint for application
    /// queries.
    pub fn select_method(mut self, method: impl Into<String>) -> Self {
        self.select_method = Some(method.into());
        self
    }

    /// Sets the session establishment timeout.
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    ///
    /// Fails if no server name is set or the port is zero.
    pub fn build(self) -> Result<DataSourceConfig> {
        let server_name = self
            .server_name
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SqlGateError::Configuration("server name is required".to_string()))?;

        let port_number = self.port_number.unwrap_or(DEFAULT_PORT);
        if port_number == 0 {
            return Err(SqlGateError::Configuration(
                "port number must be non-zero".to_string(),
            ));
        }

        Ok(DataSourceConfig {
            server_name,
            port_number,
            database_name: self.database_name.unwrap_or_else(|| "master".to_string()),
            user: self.user,
            password: self.password,
            application_name: self.application_name,
            send_string_parameters_as_unicode: self.send_string_parameters_as_unicode,
            select_method: self.select_method,
            login_timeout: self.login_timeout.unwrap_or(DEFAULT_LOGIN_TIMEOUT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_properties() -> ConnectionProperties {
        let mut props = ConnectionProperties::new();
        props.set(keys::SERVER_NAME, "db.example.com");
        props.set(keys::PORT_NUMBER, "1543");
        props.set(keys::DATABASE_NAME, "orders");
        props.set(keys::USER, "app");
        props.set(keys::PASSWORD, "secret");
        props.set(keys::SEND_STRING_PARAMETERS_AS_UNICODE, "false");
        props.set(keys::SELECT_METHOD, "cursor");
        props.set("customExtension", "42");
        props
    }

    #[test]
    fn test_derive_forces_unicode_parameters() {
        let derived = derive_control_properties(&sample_properties());
        assert_eq!(derived.send_string_parameters_as_unicode(), Some(true));
    }

    #[test]
    fn test_derive_forces_unicode_even_when_absent() {
        let mut props = sample_properties();
        props.remove(keys::SEND_STRING_PARAMETERS_AS_UNICODE);

        let derived = derive_control_properties(&props);
        assert_eq!(derived.send_string_parameters_as_unicode(), Some(true));
    }

    #[test]
    fn test_derive_strips_select_method() {
        let derived = derive_control_properties(&sample_properties());
        assert!(!derived.contains(keys::SELECT_METHOD));
    }

    #[test]
    fn test_derive_leaves_other_properties_untouched() {
        let input = sample_properties();
        let derived = derive_control_properties(&input);

        for (key, value) in input.iter() {
            if key == keys::SEND_STRING_PARAMETERS_AS_UNICODE || key == keys::SELECT_METHOD {
                continue;
            }
            assert_eq!(derived.get(key), Some(value), "property {} changed", key);
        }
        assert_eq!(derived.len(), input.len() - 1);
    }

    #[test]
    fn test_derive_same_server_identity() {
        let input = sample_properties();
        let derived = derive_control_properties(&input);
        assert_eq!(derived.server_name(), input.server_name());
        assert_eq!(derived.port_number(), input.port_number());
        assert_eq!(derived.database_name(), input.database_name());
    }

    #[test]
    fn test_derive_is_pure() {
        let input = sample_properties();
        let before = input.clone();
        let _ = derive_control_properties(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_connection_string_parse() {
        let props = ConnectionProperties::from_connection_string(
            "serverName=db.example.com;portNumber=1543;databaseName=orders;",
        )
        .unwrap();
        assert_eq!(props.server_name(), Some("db.example.com"));
        assert_eq!(props.port_number(), Some(1543));
        assert_eq!(props.database_name(), Some("orders"));
    }

    #[test]
    fn test_connection_string_rejects_malformed_segment() {
        let result = ConnectionProperties::from_connection_string("serverName=a;nonsense");
        assert!(matches!(result, Err(SqlGateError::Configuration(_))));
    }

    #[test]
    fn test_connection_string_trims_whitespace() {
        let props =
            ConnectionProperties::from_connection_string(" serverName = db ; user = app ").unwrap();
        assert_eq!(props.server_name(), Some("db"));
        assert_eq!(props.get(keys::USER), Some("app"));
    }

    #[test]
    fn test_data_source_builder_defaults() {
        let config = DataSourceConfig::builder()
            .server_name("db.example.com")
            .build()
            .unwrap();
        assert_eq!(config.port_number(), DEFAULT_PORT);
        assert_eq!(config.database_name(), "master");
        assert_eq!(config.login_timeout(), DEFAULT_LOGIN_TIMEOUT);
        assert!(config.user().is_none());
    }

    #[test]
    fn test_data_source_builder_requires_server_name() {
        assert!(DataSourceConfig::builder().build().is_err());
        assert!(DataSourceConfig::builder().server_name("").build().is_err());
    }

    #[test]
    fn test_data_source_builder_rejects_zero_port() {
        let result = DataSourceConfig::builder()
            .server_name("db")
            .port_number(0)
            .build();
        assert!(matches!(result, Err(SqlGateError::Configuration(_))));
    }

    #[test]
    fn test_to_properties_resolves_credentials() {
        let config = DataSourceConfig::builder()
            .server_name("db")
            .database_name("orders")
            .credentials("configured", "pw")
            .build()
            .unwrap();

        let props = config.to_properties(None, None);
        assert_eq!(props.get(keys::USER), Some("configured"));

        let props = config.to_properties(Some("override"), Some("pw2"));
        assert_eq!(props.get(keys::USER), Some("override"));
        assert_eq!(props.get(keys::PASSWORD), Some("pw2"));
    }

    #[test]
    fn test_to_properties_omits_absent_credentials() {
        let config = DataSourceConfig::builder().server_name("db").build().unwrap();
        let props = config.to_properties(None, None);
        assert!(!props.contains(keys::USER));
        assert!(!props.contains(keys::PASSWORD));
    }

    #[test]
    fn test_to_properties_emits_driver_hints() {
        let config = DataSourceConfig::builder()
            .server_name("db")
            .send_string_parameters_as_unicode(false)
            .select_method("cursor")
            .build()
            .unwrap();

        let props = config.to_properties(None, None);
        assert_eq!(
            props.get(keys::SEND_STRING_PARAMETERS_AS_UNICODE),
            Some("false")
        );
        assert_eq!(props.get(keys::SELECT_METHOD), Some("cursor"));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = DataSourceConfig::builder()
            .server_name("db.example.com")
            .port_number(5000)
            .database_name("orders")
            .credentials("app", "secret")
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: DataSourceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
