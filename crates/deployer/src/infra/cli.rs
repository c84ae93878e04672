use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
    time::Duration,
};

#[derive(Debug, clap::Parser)]
#[clap(about = "Deploys a compiled contract to an EVM network")]
pub struct Args {
    /// Path to the deployment configuration file in TOML format. Without it
    /// the built-in configuration with the `localhost` and `sepolia` networks
    /// is used.
    #[clap(long, env = "DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// The network to deploy to. Defaults to the `default-network` of the
    /// configuration.
    #[clap(long, env)]
    pub network: Option<String>,

    /// The contract to deploy, either its name or its fully qualified name
    /// (`contracts/Name.sol:Name`). Defaults to the configured contract.
    #[clap(long, env)]
    pub contract: Option<String>,

    /// Maximum time in seconds to wait for the deployment transaction to be
    /// confirmed. Overrides the timeout of the network profile.
    #[clap(long, env, value_parser = duration_from_seconds)]
    pub confirmation_timeout: Option<Duration>,

    /// File with environment variables to load before reading the
    /// configuration. A missing file is ignored.
    #[clap(long, env, default_value = ".env")]
    pub env_file: PathBuf,

    /// The log filter.
    #[clap(long, env, default_value = "warn,deployer=info")]
    pub log: String,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub log_json: bool,
}

impl Display for Args {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            config,
            network,
            contract,
            confirmation_timeout,
            env_file,
            log,
            log_json,
        } = self;

        display_option(f, "config", &config.as_ref().map(|path| path.display()))?;
        display_option(f, "network", network)?;
        display_option(f, "contract", contract)?;
        writeln!(f, "confirmation_timeout: {confirmation_timeout:?}")?;
        writeln!(f, "env_file: {}", env_file.display())?;
        writeln!(f, "log: {log}")?;
        writeln!(f, "log_json: {log_json}")?;
        Ok(())
    }
}

fn display_option(f: &mut Formatter<'_>, name: &str, option: &Option<impl Display>) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}

pub fn duration_from_seconds(s: &str) -> anyhow::Result<Duration> {
    Ok(Duration::try_from_secs_f64(s.parse()?)?)
}
