//! Tests which only require an ODBC driver manager to be installed, but no data source.
use anyhow::Error as AnyError;
use odbc_dyn::{CAPABILITIES, Environment, Error, FetchMode, OdbcVersion};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn allocate_environment() -> Result<(), AnyError> {
    init_logging();
    let env = Environment::new()?;
    assert_eq!(OdbcVersion::default(), env.odbc_version());
    assert!(env.close()?);
    Ok(())
}

#[test]
fn declare_odbc_3_explicitly() -> Result<(), AnyError> {
    let env = Environment::new()?;
    env.set_odbc_version(OdbcVersion::Odbc3)?;
    assert_eq!(OdbcVersion::Odbc3, env.odbc_version());
    assert_eq!(3, env.u32_attribute(odbc_dyn::ENV_ODBC_VERSION)?);
    Ok(())
}

#[test]
fn closing_twice_reports_already_closed() -> Result<(), AnyError> {
    let env = Environment::new()?;
    assert!(env.close()?);
    assert!(!env.close()?);
    assert!(env.is_closed());
    // Operations on a closed environment fail instead of touching a freed handle.
    assert!(matches!(env.connection(), Err(Error::Closed("environment"))));
    Ok(())
}

#[test]
fn environment_with_open_connection_refuses_to_close() -> Result<(), AnyError> {
    let env = Environment::new()?;
    let conn = env.connection()?;
    assert_eq!(1, env.open_connections());

    let result = env.close();

    assert!(matches!(
        result,
        Err(Error::OpenChildren {
            parent: "environment",
            count: 1
        })
    ));
    assert!(!env.is_closed());

    assert!(conn.close()?);
    assert_eq!(0, env.open_connections());
    assert!(env.close()?);
    Ok(())
}

#[test]
fn dropping_unconnected_connection_releases_it() -> Result<(), AnyError> {
    let env = Environment::new()?;
    {
        let _conn = env.connection()?;
        assert_eq!(1, env.open_connections());
    }
    assert_eq!(0, env.open_connections());
    Ok(())
}

#[test]
fn closed_connection_refuses_operations() -> Result<(), AnyError> {
    let env = Environment::new()?;
    let conn = env.connection()?;
    assert!(conn.close()?);
    assert!(!conn.close()?);
    assert!(matches!(conn.execute("SELECT 1"), Err(Error::Closed("connection"))));
    assert!(matches!(conn.statement(), Err(Error::Closed("connection"))));
    Ok(())
}

#[test]
fn unconnected_connection_is_not_connected() -> Result<(), AnyError> {
    let env = Environment::new()?;
    let mut conn = env.connection()?;
    assert!(!conn.is_connected()?);
    // Disconnecting a connection which never connected is fine.
    conn.disconnect()?;
    Ok(())
}

#[test]
fn login_timeout_is_applied_to_new_connections() -> Result<(), AnyError> {
    let env = Environment::new()?;
    env.set_login_timeout(Some(7));
    assert_eq!(Some(7), env.login_timeout());
    // Setting the attribute is part of the allocation
    let conn = env.connection()?;
    assert!(conn.close()?);
    Ok(())
}

#[test]
fn connect_to_unknown_data_source() -> Result<(), AnyError> {
    let env = Environment::new()?;

    let result = env.connect("DataSourceWhichDoesNotExist", None, None);

    // Data source name not found and no default driver specified
    let error = result.unwrap_err();
    assert_eq!(Some("IM002"), error.state());
    // The failed connection has been freed.
    assert_eq!(0, env.open_connections());
    Ok(())
}

#[test]
fn connect_with_malformed_attribute() -> Result<(), AnyError> {
    let env = Environment::new()?;

    let result = env.connect_with_attributes(&[("Driver", "Anything"), ("Ser;ver", "localhost")]);

    assert!(matches!(result, Err(Error::InvalidConnectionAttribute(key)) if key == "Ser;ver"));
    assert_eq!(0, env.open_connections());
    Ok(())
}

#[test]
fn list_drivers_and_data_sources() -> Result<(), AnyError> {
    init_logging();
    let env = Environment::new()?;

    // The result depends on the system. Listing must not fail, though.
    for driver in env.drivers()? {
        assert!(!driver.description.is_empty());
    }
    for data_source in env.data_sources()? {
        assert!(!data_source.server_name.is_empty());
    }
    env.user_data_sources()?;
    env.system_data_sources()?;
    Ok(())
}

#[test]
fn fetch_mode_options() {
    assert_eq!(FetchMode::Positional, FetchMode::from_options(""));
    assert_eq!(FetchMode::Named, FetchMode::from_options("a"));
    assert_eq!(FetchMode::Both, FetchMode::from_options("an"));
}

#[test]
fn capabilities_are_listed() {
    assert!(CAPABILITIES.iter().any(|c| c.name == "supports_transactions"));
}
