use {
    super::{AccountsConfig, Config, NetworkConfig},
    crate::{
        domain::{
            contract::ContractId,
            network::{Accounts, Confirmation, Credential, NetworkProfile},
        },
        infra::{self, observe},
    },
    anyhow::{Context, anyhow, ensure},
    std::path::Path,
    tokio::fs,
    url::Url,
};

/// Load the deployment configuration from a TOML file. `env` resolves the
/// `${NAME}` references in network URLs and accounts.
pub async fn load(
    path: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<infra::Config> {
    let data = fs::read_to_string(path)
        .await
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    parse(&data, env, path.parent()).with_context(|| format!("invalid config file {path:?}"))
}

/// Parse the deployment configuration. Relative artifact directories are
/// resolved against `base` if given.
pub fn parse(
    data: &str,
    env: &dyn Fn(&str) -> Option<String>,
    base: Option<&Path>,
) -> anyhow::Result<infra::Config> {
    // Not printing the detailed error because its snippet could leak private
    // keys.
    let config: Config = toml::from_str(data).map_err(|err| match err.span() {
        Some(span) => anyhow!(
            "TOML error at line {}",
            data[..span.start].matches('\n').count() + 1
        ),
        None => anyhow!("TOML error"),
    })?;

    let networks = config
        .networks
        .into_iter()
        .map(|(name, network)| {
            let profile = profile(&name, network, env)
                .with_context(|| format!("invalid network {name:?}"))?;
            Ok((name, profile))
        })
        .collect::<anyhow::Result<_>>()?;

    let artifacts = match base {
        Some(base) if config.artifacts.is_relative() => base.join(&config.artifacts),
        _ => config.artifacts,
    };

    Ok(infra::Config {
        solidity: config.solidity,
        artifacts,
        default_network: config.default_network,
        contract: infra::config::Contract {
            id: ContractId::new(config.contract.name),
            display_name: config.contract.display_name,
            constructor_args: config.contract.constructor_args,
            libraries: config.contract.libraries,
        },
        networks,
    })
}

fn profile(
    name: &str,
    network: NetworkConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<NetworkProfile> {
    ensure!(
        network.confirmations > 0,
        "at least one confirmation is required"
    );
    let url = interpolate(&network.url, env)
        .context("invalid url")?
        .parse::<Url>()
        .context("invalid url")?;
    let accounts = match network.accounts {
        AccountsConfig::Remote(_) => Accounts::Remote,
        AccountsConfig::Local(keys) => Accounts::Local(
            keys.iter()
                .enumerate()
                .filter_map(|(index, key)| match interpolate(key, env) {
                    Ok(key) => Some(Ok(Credential::new(key))),
                    Err(Interpolation::Unset(variable)) => {
                        observe::unset_credential(name, index, &variable);
                        None
                    }
                    Err(err) => Some(Err(
                        anyhow::Error::new(err).context(format!("invalid account {index}"))
                    )),
                })
                .collect::<anyhow::Result<_>>()?,
        ),
    };

    Ok(NetworkProfile {
        name: name.to_string(),
        url,
        accounts,
        chain_id: network.chain_id,
        confirmation: Confirmation {
            timeout: network.confirmation_timeout,
            confirmations: network.confirmations,
        },
    })
}

#[derive(Debug, thiserror::Error)]
enum Interpolation {
    #[error("environment variable {0} is not set")]
    Unset(String),
    #[error("unterminated environment variable reference")]
    Unterminated,
}

/// Replaces every `${NAME}` in `value` with the value of the environment
/// variable `NAME`. Empty variables count as unset.
fn interpolate(
    value: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String, Interpolation> {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let reference = &rest[start + 2..];
        let end = reference.find('}').ok_or(Interpolation::Unterminated)?;
        let name = &reference[..end];
        match env(name) {
            Some(value) if !value.is_empty() => result.push_str(&value),
            _ => return Err(Interpolation::Unset(name.to_string())),
        }
        rest = &reference[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use {
        super::{super::DEFAULT, *},
        alloy::primitives::address,
        maplit::hashmap,
        std::{collections::HashMap, path::PathBuf, time::Duration},
    };

    fn env(vars: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |name| vars.get(name).map(|value| value.to_string())
    }

    fn credentials(profile: &NetworkProfile) -> usize {
        match &profile.accounts {
            Accounts::Local(credentials) => credentials.len(),
            Accounts::Remote => panic!("expected local accounts"),
        }
    }

    #[test]
    fn default_config_mirrors_hardhat_project() {
        let env = env(hashmap! { "PRIVATE_KEY" => "0x01" });
        let config = parse(DEFAULT, &env, None).unwrap();

        assert_eq!(config.solidity, "0.8.28");
        assert_eq!(config.artifacts, PathBuf::from("artifacts"));
        assert_eq!(config.contract.id, ContractId::new("AuctionManager"));
        assert_eq!(config.contract.display_name, "Auction");
        assert!(config.contract.constructor_args.is_empty());

        let localhost = config.profile(Some("localhost")).unwrap();
        assert_eq!(localhost.url.as_str(), "http://localhost:8545/");
        assert_eq!(credentials(localhost), 1);
        assert_eq!(localhost.confirmation, Confirmation::default());

        let sepolia = config.profile(Some("sepolia")).unwrap();
        assert_eq!(sepolia.url.as_str(), "https://sepolia.gateway.tenderly.co/");
        assert_eq!(sepolia.chain_id, None);
    }

    #[test]
    fn unset_private_key_drops_credential() {
        let config = parse(DEFAULT, &env(hashmap! {}), None).unwrap();
        assert_eq!(credentials(config.profile(Some("sepolia")).unwrap()), 0);

        let config = parse(DEFAULT, &env(hashmap! { "PRIVATE_KEY" => "" }), None).unwrap();
        assert_eq!(credentials(config.profile(Some("localhost")).unwrap()), 0);
    }

    #[test]
    fn parses_full_config() {
        let config = parse(
            r#"
            solidity = "0.8.24"
            artifacts = "out"
            default-network = "devnet"

            [contract]
            name = "contracts/AuctionManager.sol:AuctionManager"
            display-name = "Manager"
            constructor-args = ["3600"]
            libraries = { BidMath = "0x5FbDB2315678afecb367f032d93F642f64180aa3" }

            [networks.devnet]
            url = "https://rpc.example.org/${API_KEY}"
            accounts = "remote"
            chain-id = 1337
            confirmations = 3
            confirmation-timeout = "2m 30s"
            "#,
            &env(hashmap! { "API_KEY" => "abc" }),
            Some(Path::new("/project")),
        )
        .unwrap();

        assert_eq!(config.artifacts, PathBuf::from("/project/out"));
        assert_eq!(config.contract.id.name(), "AuctionManager");
        assert_eq!(config.contract.constructor_args, vec!["3600".to_string()]);
        assert_eq!(
            config.contract.libraries["BidMath"],
            address!("0x5FbDB2315678afecb367f032d93F642f64180aa3")
        );

        let devnet = config.profile(None).unwrap();
        assert_eq!(devnet.url.as_str(), "https://rpc.example.org/abc");
        assert!(matches!(devnet.accounts, Accounts::Remote));
        assert_eq!(devnet.chain_id, Some(1337));
        assert_eq!(
            devnet.confirmation,
            Confirmation {
                timeout: Some(Duration::from_secs(150)),
                confirmations: 3,
            }
        );
    }

    #[test]
    fn rejects_invalid_networks() {
        let unset_url = r#"
            solidity = "0.8.28"
            default-network = "devnet"
            [networks.devnet]
            url = "https://rpc.example.org/${API_KEY}"
        "#;
        assert!(parse(unset_url, &env(hashmap! {}), None).is_err());

        let no_confirmations = r#"
            solidity = "0.8.28"
            default-network = "devnet"
            [networks.devnet]
            url = "http://localhost:8545"
            confirmations = 0
        "#;
        assert!(parse(no_confirmations, &env(hashmap! {}), None).is_err());

        let unknown_field = r#"
            solidity = "0.8.28"
            default-network = "devnet"
            [networks.devnet]
            url = "http://localhost:8545"
            gas-price = 1
        "#;
        assert!(parse(unknown_field, &env(hashmap! {}), None).is_err());
    }

    #[test]
    fn syntax_errors_do_not_leak_values() {
        let err = parse(
            "solidity = \"0.8.28\"\nprivate-key = 0xac0974bec39a",
            &env(hashmap! {}),
            None,
        )
        .unwrap_err();
        assert!(!format!("{err:?}").contains("ac0974"));
    }

    #[test]
    fn interpolates_environment_references() {
        let env = env(hashmap! { "A" => "1", "B" => "2" });
        assert_eq!(interpolate("${A}-${B}", &env).unwrap(), "1-2");
        assert_eq!(interpolate("plain", &env).unwrap(), "plain");
        assert!(matches!(
            interpolate("${C}", &env),
            Err(Interpolation::Unset(name)) if name == "C"
        ));
        assert!(matches!(
            interpolate("${A", &env),
            Err(Interpolation::Unterminated)
        ));
    }

    #[tokio::test]
    async fn loads_file_relative_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(&path, DEFAULT).unwrap();

        let config = load(&path, &env(hashmap! {})).await.unwrap();
        assert_eq!(config.artifacts, dir.path().join("artifacts"));

        assert!(load(&dir.path().join("missing.toml"), &env(hashmap! {})).await.is_err());
    }
}
