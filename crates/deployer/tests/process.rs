//! Exit code and output streams of the `deployer` binary.

use {
    serde_json::json,
    std::{
        path::Path,
        process::{Command, Output},
    },
};

/// Runs the binary in `dir` with an empty environment file and none of the
/// variables that could select a different setup.
fn deployer(dir: &Path, args: &[&str]) -> Output {
    let env_file = dir.join(".env");
    std::fs::write(&env_file, "").unwrap();
    Command::new(env!("CARGO_BIN_EXE_deployer"))
        .current_dir(dir)
        .args(args)
        .arg("--env-file")
        .arg(&env_file)
        .env_remove("PRIVATE_KEY")
        .env_remove("NETWORK")
        .env_remove("CONTRACT")
        .env_remove("DEPLOY_CONFIG")
        .env_remove("CONFIRMATION_TIMEOUT")
        .env_remove("LOG_JSON")
        .env("LOG", "warn,deployer=info")
        .output()
        .unwrap()
}

#[test]
fn sepolia_without_private_key_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();

    let output = deployer(dir.path(), &["--network", "sepolia"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Error: no signer available for network \"sepolia\""));
}

#[test]
fn unknown_network_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();

    let output = deployer(dir.path(), &["--network", "mainnet"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("network \"mainnet\" is not configured"));
}

#[test]
#[ignore]
fn local_node_deployment_exits_with_success() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir
        .path()
        .join("artifacts/contracts/AuctionManager.sol/AuctionManager.json");
    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    std::fs::write(
        artifact,
        json!({
            "contractName": "AuctionManager",
            "sourceName": "contracts/AuctionManager.sol",
            "abi": [],
            "bytecode": "0x600080f3",
            "linkReferences": {},
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("deploy.toml"),
        r#"
        solidity = "0.8.28"
        default-network = "localhost"

        [networks.localhost]
        url = "http://127.0.0.1:8545"
        accounts = ["0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"]
        confirmation-timeout = "30s"
        "#,
    )
    .unwrap();

    let output = deployer(dir.path(), &["--config", "deploy.toml"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "Deploying contracts with the account: 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
    );
    assert!(lines[1].starts_with("Auction deployed to: 0x"));
    assert_eq!(lines.len(), 2);
}
