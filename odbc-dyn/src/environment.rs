use std::{
    cell::{Cell, RefCell},
    cmp::max,
    collections::HashMap,
    rc::Rc,
};

use log::debug;
use odbc_sys::FetchOrientation;

use crate::{
    Connection, Error,
    attributes::ENV_ODBC_VERSION,
    connection::connection_string,
    handles::{self, SqlResult},
    lifecycle::{OpenChildren, free_handle},
};

/// Version of the ODBC API an application declares to the driver manager. It determines the
/// behavior of the driver manager, e.g. which SQLSTATEs are reported or whether `SQL_NO_DATA` is
/// returned for searched updates without affected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdbcVersion {
    Odbc2,
    Odbc3,
    /// ODBC 3.80. Requires a driver manager supporting it, i.e. not iodbc.
    Odbc3_80,
}

impl OdbcVersion {
    /// Value of `SQL_ATTR_ODBC_VERSION`.
    pub fn as_u32(self) -> u32 {
        match self {
            OdbcVersion::Odbc2 => 2,
            OdbcVersion::Odbc3 => 3,
            OdbcVersion::Odbc3_80 => 380,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            2 => Some(OdbcVersion::Odbc2),
            3 => Some(OdbcVersion::Odbc3),
            380 => Some(OdbcVersion::Odbc3_80),
            _ => None,
        }
    }

    pub fn is_odbc3(self) -> bool {
        !matches!(self, OdbcVersion::Odbc2)
    }
}

impl Default for OdbcVersion {
    /// ODBC 3.80, unless the crate is compiled for ODBC 3.5 driver managers.
    fn default() -> Self {
        if cfg!(feature = "odbc_version_3_80") && !cfg!(feature = "odbc_version_3_5") {
            OdbcVersion::Odbc3_80
        } else {
            OdbcVersion::Odbc3
        }
    }
}

/// Shared between the [`Environment`] and its connections, so the native environment handle
/// outlives all of them.
#[derive(Debug)]
pub(crate) struct EnvironmentInner {
    /// `None` once closed.
    handle: RefCell<Option<handles::Environment>>,
    version: Cell<OdbcVersion>,
    /// Applied to each connection allocated afterwards.
    login_timeout: Cell<Option<u32>>,
    pub(crate) connections: OpenChildren,
}

impl EnvironmentInner {
    pub(crate) fn version(&self) -> OdbcVersion {
        self.version.get()
    }

    pub(crate) fn login_timeout(&self) -> Option<u32> {
        self.login_timeout.get()
    }

    pub(crate) fn with_handle<T>(
        &self,
        f: impl FnOnce(&handles::Environment) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let handle = self.handle.borrow();
        let handle = handle.as_ref().ok_or(Error::Closed("environment"))?;
        f(handle)
    }
}

/// Entry point to the driver manager. Connections are opened from here, and keep the environment
/// alive for as long as they exist.
///
/// ```no_run
/// use odbc_dyn::Environment;
///
/// let env = Environment::new()?;
/// let conn = env.connect("DataSourceName", Some("user"), Some("password"))?;
/// if let Some(mut cursor) = conn.execute("SELECT year, name FROM Birthdays;")?.into_result_set() {
///     while let Some(row) = cursor.fetch()? {
///         println!("{row:?}");
///     }
/// }
/// # Ok::<(), odbc_dyn::Error>(())
/// ```
#[derive(Debug)]
pub struct Environment {
    inner: Rc<EnvironmentInner>,
}

impl Environment {
    /// Allocates an environment handle and declares the default ODBC version, see
    /// [`OdbcVersion::default`].
    pub fn new() -> Result<Self, Error> {
        // Safety: This crate only allows access to the environment from one thread.
        let environment = match unsafe { handles::Environment::new() } {
            SqlResult::Success(env) | SqlResult::SuccessWithInfo(env) => env,
            _ => return Err(Error::FailedAllocatingEnvironment),
        };
        let version = OdbcVersion::default();
        debug!("ODBC Environment created. Declaring ODBC version {}.", version.as_u32());
        environment
            .declare_version(version.as_u32())
            .into_result(&environment)?;
        Ok(Self {
            inner: Rc::new(EnvironmentInner {
                handle: RefCell::new(Some(environment)),
                version: Cell::new(version),
                login_timeout: Cell::new(None),
                connections: OpenChildren::default(),
            }),
        })
    }

    /// Declares another version of the ODBC API. Must happen before any connection is allocated.
    pub fn set_odbc_version(&self, version: OdbcVersion) -> Result<(), Error> {
        self.inner.with_handle(|env| {
            env.declare_version(version.as_u32()).into_result(env)
        })?;
        self.inner.version.set(version);
        Ok(())
    }

    pub fn odbc_version(&self) -> OdbcVersion {
        self.inner.version()
    }

    /// Login timeout in seconds, applied to every connection allocated afterwards. `0` disables
    /// the timeout, `None` leaves the driver default in place.
    pub fn set_login_timeout(&self, seconds: Option<u32>) {
        self.inner.login_timeout.set(seconds);
    }

    pub fn login_timeout(&self) -> Option<u32> {
        self.inner.login_timeout()
    }

    /// Allocates a connection, which is not connected to any data source yet.
    pub fn connection(&self) -> Result<Connection, Error> {
        Connection::allocate(self.inner.clone())
    }

    /// Connects to a data source configured in the driver manager.
    ///
    /// * `data_source_name`: Name of the data source, as listed by [`Self::data_sources`].
    /// * `user`: User identifier, if not part of the data source configuration.
    /// * `pwd`: Password, if not part of the data source configuration.
    pub fn connect(
        &self,
        data_source_name: &str,
        user: Option<&str>,
        pwd: Option<&str>,
    ) -> Result<Connection, Error> {
        let mut connection = self.connection()?;
        connection.connect(data_source_name, user, pwd)?;
        Ok(connection)
    }

    /// Connects using a connection string, e.g. `"Driver={SQLite3};Database=my.db;"`. The driver
    /// manager never prompts. Returns the connection together with the completed connection string
    /// reported by the driver.
    pub fn connect_with_connection_string(
        &self,
        connection_string: &str,
    ) -> Result<(Connection, String), Error> {
        let mut connection = self.connection()?;
        let completed = connection.connect_with_connection_string(connection_string)?;
        Ok((connection, completed))
    }

    /// Connects with a connection string assembled from `key=value` pairs.
    ///
    /// ```no_run
    /// use odbc_dyn::Environment;
    ///
    /// let env = Environment::new()?;
    /// let (conn, _completed) = env.connect_with_attributes(&[
    ///     ("Driver", "PostgreSQL Unicode"),
    ///     ("Server", "localhost"),
    ///     ("Pwd", "my;secret"),
    /// ])?;
    /// # Ok::<(), odbc_dyn::Error>(())
    /// ```
    pub fn connect_with_attributes(
        &self,
        attributes: &[(&str, &str)],
    ) -> Result<(Connection, String), Error> {
        let connection_string = connection_string(attributes)?;
        self.connect_with_connection_string(&connection_string)
    }

    /// Number of connections allocated on this environment which are still open.
    pub fn open_connections(&self) -> usize {
        self.inner.connections.count()
    }

    pub fn set_u32_attribute(&self, attribute: i32, value: u32) -> Result<(), Error> {
        self.inner
            .with_handle(|env| env.set_attribute_u32(attribute, value).into_result(env))?;
        if attribute == ENV_ODBC_VERSION {
            if let Some(version) = OdbcVersion::from_u32(value) {
                self.inner.version.set(version);
            }
        }
        Ok(())
    }

    pub fn u32_attribute(&self, attribute: i32) -> Result<u32, Error> {
        self.inner
            .with_handle(|env| env.attribute_u32(attribute).into_result(env))
    }

    pub fn set_str_attribute(&self, attribute: i32, value: &str) -> Result<(), Error> {
        self.inner
            .with_handle(|env| env.set_attribute_str(attribute, value).into_result(env))
    }

    pub fn str_attribute(&self, attribute: i32) -> Result<String, Error> {
        self.inner.with_handle(|env| {
            let mut buf = Vec::new();
            env.attribute_str(attribute, &mut buf).into_result(env)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    }

    /// List of installed drivers, with their attributes.
    pub fn drivers(&self) -> Result<Vec<InstalledDriver>, Error> {
        self.inner.with_handle(|env| {
            // Find required buffer size to avoid truncation. Start with first so we are
            // independent of state.
            let Some((mut desc_len, mut attr_len)) = env
                .drivers_buffer_len(FetchOrientation::First)
                .into_result_option(env)?
            else {
                // No drivers present
                return Ok(Vec::new());
            };
            while let Some((candidate_desc_len, candidate_attr_len)) = env
                .drivers_buffer_len(FetchOrientation::Next)
                .into_result_option(env)?
            {
                desc_len = max(candidate_desc_len, desc_len);
                attr_len = max(candidate_attr_len, attr_len);
            }

            let mut drivers = Vec::new();
            let mut direction = FetchOrientation::First;
            loop {
                // +1 for the terminating zero
                let mut desc_buf = Vec::with_capacity(desc_len as usize + 1);
                let mut attr_buf = Vec::with_capacity(attr_len as usize + 1);
                let found = env
                    .drivers_buffer_fill(direction, &mut desc_buf, &mut attr_buf)
                    .into_result_bool(env)?;
                if !found {
                    break;
                }
                drivers.push(InstalledDriver {
                    description: String::from_utf8_lossy(&desc_buf).into_owned(),
                    attributes: attributes_iter(&String::from_utf8_lossy(&attr_buf)).collect(),
                });
                direction = FetchOrientation::Next;
            }
            Ok(drivers)
        })
    }

    /// User and system data sources.
    pub fn data_sources(&self) -> Result<Vec<DataSourceInfo>, Error> {
        self.data_sources_impl(FetchOrientation::First)
    }

    pub fn system_data_sources(&self) -> Result<Vec<DataSourceInfo>, Error> {
        self.data_sources_impl(FetchOrientation::FirstSystem)
    }

    pub fn user_data_sources(&self) -> Result<Vec<DataSourceInfo>, Error> {
        self.data_sources_impl(FetchOrientation::FirstUser)
    }

    fn data_sources_impl(&self, first: FetchOrientation) -> Result<Vec<DataSourceInfo>, Error> {
        self.inner.with_handle(|env| {
            let Some((mut name_len, mut desc_len)) = env
                .data_source_buffer_len(first)
                .into_result_option(env)?
            else {
                return Ok(Vec::new());
            };
            while let Some((candidate_name_len, candidate_desc_len)) = env
                .data_source_buffer_len(FetchOrientation::Next)
                .into_result_option(env)?
            {
                name_len = max(candidate_name_len, name_len);
                desc_len = max(candidate_desc_len, desc_len);
            }

            let mut data_sources = Vec::new();
            let mut direction = first;
            loop {
                let mut name_buf = Vec::with_capacity(name_len as usize + 1);
                let mut desc_buf = Vec::with_capacity(desc_len as usize + 1);
                let found = env
                    .data_source_buffer_fill(direction, &mut name_buf, &mut desc_buf)
                    .into_result_bool(env)?;
                if !found {
                    break;
                }
                data_sources.push(DataSourceInfo {
                    server_name: String::from_utf8_lossy(&name_buf).into_owned(),
                    driver: String::from_utf8_lossy(&desc_buf).into_owned(),
                });
                direction = FetchOrientation::Next;
            }
            Ok(data_sources)
        })
    }

    /// Frees the environment handle. Fails with [`Error::OpenChildren`] while connections are
    /// open. `false` if the environment has already been closed.
    pub fn close(&self) -> Result<bool, Error> {
        if self.inner.handle.borrow().is_none() {
            return Ok(false);
        }
        self.inner.connections.ensure_none("environment")?;
        let Some(handle) = self.inner.handle.borrow_mut().take() else {
            return Ok(false);
        };
        free_handle(handle)?;
        debug!("ODBC Environment closed.");
        Ok(true)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.handle.borrow().is_none()
    }
}

/// Holds name and description of a driver.
///
/// Can be obtained via [`Environment::drivers`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstalledDriver {
    /// Name of the ODBC driver
    pub description: String,
    /// Attributes values of the driver by key
    pub attributes: HashMap<String, String>,
}

/// Holds name and description of a datasource.
///
/// Can be obtained via [`Environment::data_sources`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataSourceInfo {
    /// Name of the data source
    pub server_name: String,
    /// Description of the data source
    pub driver: String,
}

/// Parses the attribute list reported by drivers. Key value pairs are separated by `\0`, key and
/// value by `=`.
fn attributes_iter(attributes: &str) -> impl Iterator<Item = (String, String)> + '_ {
    attributes
        .split('\0')
        .take_while(|kv_str| !kv_str.is_empty())
        .map(|kv_str| {
            let (key, value) = kv_str.split_once('=').unwrap_or((kv_str, ""));
            (key.to_string(), value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{OdbcVersion, attributes_iter};

    #[test]
    fn parse_attributes() {
        let buffer = "APILevel=2\0ConnectFunctions=YYY\0CPTimeout=60\0DriverODBCVer=03.\
                      50\0FileUsage=0\0SQLLevel=1\0UsageCount=1\0\0";
        let attributes: HashMap<_, _> = attributes_iter(buffer).collect();
        assert_eq!(attributes["APILevel"], "2");
        assert_eq!(attributes["ConnectFunctions"], "YYY");
        assert_eq!(attributes["CPTimeout"], "60");
        assert_eq!(attributes["DriverODBCVer"], "03.50");
        assert_eq!(attributes["FileUsage"], "0");
        assert_eq!(attributes["SQLLevel"], "1");
        assert_eq!(attributes["UsageCount"], "1");
    }

    #[test]
    fn attribute_without_value() {
        let attributes: HashMap<_, _> = attributes_iter("Setup\0\0").collect();
        assert_eq!(attributes["Setup"], "");
    }

    #[test]
    fn only_odbc_2_skips_odbc_3_behavior() {
        assert!(!OdbcVersion::Odbc2.is_odbc3());
        assert!(OdbcVersion::Odbc3.is_odbc3());
        assert!(OdbcVersion::Odbc3_80.is_odbc3());
        assert_eq!(Some(OdbcVersion::Odbc3_80), OdbcVersion::from_u32(380));
        assert_eq!(None, OdbcVersion::from_u32(1));
    }
}
