use {
    crate::{
        domain::{ContractId, Deployment, DeploymentHandle, Orchestrator},
        infra::{Ethereum, Registry, cli, config, observe},
    },
    clap::Parser,
    std::{io::Write, process::ExitCode},
};

/// Deploys the configured contract once and reports the outcome as the
/// process exit code.
pub async fn start(args: impl Iterator<Item = String>) -> ExitCode {
    let args = args.collect::<Vec<_>>();
    let env_file = cli::Args::parse_from(&args).env_file;
    let loaded = dotenvy::from_path(&env_file);
    // Parsed again so the environment file can provide arguments as well.
    let args = cli::Args::parse_from(&args);
    observe::init(&args);
    if let Err(err) = &loaded {
        observe::env_file_failed(&env_file, err);
    }

    let env = |name: &str| std::env::var(name).ok();
    match run(&args, &env, &mut std::io::stdout()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

/// This function exists to enable running a deployment for testing. `env`
/// resolves the environment variables referenced by the configuration and the
/// deployment report is written to `out`.
pub async fn run(
    args: &cli::Args,
    env: &dyn Fn(&str) -> Option<String>,
    out: &mut impl Write,
) -> anyhow::Result<DeploymentHandle> {
    let config = match &args.config {
        Some(path) => config::file::load(path, env).await?,
        None => {
            observe::default_config();
            config::file::parse(config::file::DEFAULT, env, None)?
        }
    };

    let mut network = config.profile(args.network.as_deref())?.clone();
    if let Some(timeout) = args.confirmation_timeout {
        network.confirmation.timeout = Some(timeout);
    }
    let contract = match &args.contract {
        Some(contract) => ContractId::new(contract.clone()),
        None => config.contract.id,
    };

    let registry = Registry::load(
        &config.artifacts,
        config.solidity,
        config.contract.libraries,
    )
    .await?;
    let eth = Ethereum::new(&network);
    let deployment = Deployment {
        network,
        contract,
        display_name: config.contract.display_name,
        constructor_args: config.contract.constructor_args,
    };

    Ok(Orchestrator::new(&eth, &registry)
        .deploy(&deployment, out)
        .await?)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::{contract::ArtifactError, deployment},
    };

    fn args(args: &[&str]) -> cli::Args {
        ::observe::tracing::initialize_reentrant("deployer=trace");
        cli::Args::try_parse_from(["deployer"].iter().chain(args)).unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[tokio::test]
    async fn sepolia_without_private_key_fails_before_touching_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("deploy.toml");
        std::fs::write(&config, config::file::DEFAULT).unwrap();

        let mut out = Vec::new();
        let err = run(
            &args(&["--network", "sepolia", "--config", config.to_str().unwrap()]),
            &no_env,
            &mut out,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<deployment::Error>(),
            Some(deployment::Error::NoSignerAvailable { network }) if network == "sepolia"
        ));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unknown_network_is_rejected() {
        let mut out = Vec::new();
        let err = run(&args(&["--network", "mainnet"]), &no_env, &mut out)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("\"mainnet\""));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn missing_artifact_is_reported_after_signer() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("deploy.toml");
        std::fs::write(
            &config,
            r#"
            solidity = "0.8.28"
            default-network = "localhost"

            [networks.localhost]
            url = "http://127.0.0.1:9"
            accounts = ["${PRIVATE_KEY}"]
            "#,
        )
        .unwrap();
        let env = |name: &str| {
            (name == "PRIVATE_KEY").then(|| {
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string()
            })
        };

        let mut out = Vec::new();
        let err = run(
            &args(&["--config", config.to_str().unwrap(), "--contract", "Missing"]),
            &env,
            &mut out,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<deployment::Error>(),
            Some(deployment::Error::ArtifactNotFound(ArtifactError::Missing(id)))
                if id.as_str() == "Missing"
        ));
        assert!(!dir.path().join("artifacts").exists());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Deploying contracts with the account: 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n"
        );
    }
}
