use std::fmt;
use std::io;
use std::str::FromStr;

/// Name of the environment variable that selects the runtime environment.
const APP_ENVIRONMENT_ENV_NAME: &str = "APP_ENVIRONMENT";

/// Runtime environment the service is configured for.
///
/// Selects which environment-specific configuration file is layered on top of
/// the base file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    /// Loads the environment from `APP_ENVIRONMENT`, defaulting to
    /// [`Environment::Dev`] when unset.
    pub fn load() -> Result<Self, io::Error> {
        match std::env::var(APP_ENVIRONMENT_ENV_NAME) {
            Ok(value) => value
                .parse()
                .map_err(|err: String| io::Error::new(io::ErrorKind::InvalidInput, err)),
            Err(_) => Ok(Environment::Dev),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => f.write_str("dev"),
            Environment::Prod => f.write_str("prod"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(format!(
                "`{other}` is not a supported environment, use `dev` or `prod`"
            )),
        }
    }
}
