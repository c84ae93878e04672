//! Registry of the contracts compiled into an artifacts directory.
//!
//! Understands the Hardhat layout (`contracts/Name.sol/Name.json` next to a
//! `Name.dbg.json` pointing at the build info) and the Foundry layout
//! (`Name.sol/Name.json` with the bytecode under `bytecode.object`).

use {
    crate::{
        domain::contract::{ArtifactError, Build, ContractFactory, ContractId},
        infra::observe,
    },
    alloy::{
        json_abi::JsonAbi,
        primitives::{Address, Bytes, hex},
    },
    anyhow::Context,
    serde::Deserialize,
    std::{
        collections::{BTreeMap, HashMap},
        io,
        path::{Path, PathBuf},
    },
    tokio::fs,
};

/// Compiled contracts by fully qualified name. Built once at startup.
#[derive(Debug)]
pub struct Registry {
    artifacts: BTreeMap<ContractId, Artifact>,
    solidity: String,
    libraries: BTreeMap<String, Address>,
}

#[derive(Debug)]
struct Artifact {
    abi: JsonAbi,
    /// Hex encoded creation code without `0x`. May contain library
    /// placeholders.
    bytecode: String,
    link_references: LinkReferences,
    /// The solc version the artifact was compiled with, if known.
    compiler: Option<String>,
}

/// Source name -> library name -> placeholder positions in the bytecode.
type LinkReferences = BTreeMap<String, BTreeMap<String, Vec<Offset>>>;

#[derive(Debug, Clone, Copy, Deserialize)]
struct Offset {
    start: usize,
    length: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    contract_name: Option<String>,
    source_name: Option<String>,
    abi: JsonAbi,
    bytecode: BytecodeFile,
    #[serde(default)]
    link_references: LinkReferences,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeFile {
    Hardhat(String),
    #[serde(rename_all = "camelCase")]
    Foundry {
        object: String,
        #[serde(default)]
        link_references: LinkReferences,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo {
    solc_version: String,
}

impl Registry {
    /// Scans `dir` for compiled contracts. A missing directory yields an empty
    /// registry.
    pub async fn load(
        dir: &Path,
        solidity: String,
        libraries: BTreeMap<String, Address>,
    ) -> anyhow::Result<Self> {
        let mut registry = Self {
            artifacts: Default::default(),
            solidity,
            libraries,
        };
        let files = match artifact_files(dir).await {
            Ok(files) => files,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                observe::missing_artifacts(dir);
                return Ok(registry);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to scan artifacts in {dir:?}"));
            }
        };

        let mut build_infos = HashMap::new();
        for path in files {
            let data = fs::read_to_string(&path)
                .await
                .with_context(|| format!("I/O error while reading {path:?}"))?;
            let file = match serde_json::from_str::<ArtifactFile>(&data) {
                Ok(file) => file,
                Err(err) => {
                    observe::skipped_artifact(&path, &err.to_string());
                    continue;
                }
            };
            let Some((id, link_references, bytecode)) = identify(
                &path,
                file.contract_name,
                file.source_name,
                file.bytecode,
                file.link_references,
            ) else {
                observe::skipped_artifact(&path, "no contract name");
                continue;
            };
            if bytecode.is_empty() {
                observe::skipped_artifact(&path, "not deployable");
                continue;
            }

            let compiler = match compiler_version(&path, &mut build_infos).await {
                Ok(version) => version,
                Err(err) => {
                    observe::unverified_compiler(&id, &err);
                    None
                }
            };
            registry.artifacts.insert(
                id,
                Artifact {
                    abi: file.abi,
                    bytecode,
                    link_references,
                    compiler,
                },
            );
        }

        observe::artifacts_loaded(dir, &registry.artifacts.keys().collect::<Vec<_>>());
        Ok(registry)
    }

    fn find(&self, id: &ContractId) -> Result<(&ContractId, &Artifact), ArtifactError> {
        if id.is_fully_qualified() {
            return self
                .artifacts
                .get_key_value(id)
                .ok_or_else(|| ArtifactError::Missing(id.clone()));
        }

        let mut candidates = self
            .artifacts
            .iter()
            .filter(|(candidate, _)| candidate.name() == id.name());
        match (candidates.next(), candidates.next()) {
            (None, _) => Err(ArtifactError::Missing(id.clone())),
            (Some(found), None) => Ok(found),
            (Some(_), Some(_)) => Err(ArtifactError::Ambiguous {
                id: id.clone(),
                candidates: self
                    .artifacts
                    .keys()
                    .filter(|candidate| candidate.name() == id.name())
                    .cloned()
                    .collect(),
            }),
        }
    }

    fn library(&self, source: &str, name: &str) -> Option<Address> {
        self.libraries
            .get(&format!("{source}:{name}"))
            .or_else(|| self.libraries.get(name))
            .copied()
    }

    fn link(&self, id: &ContractId, artifact: &Artifact) -> Result<Bytes, ArtifactError> {
        if !artifact.bytecode.is_ascii() {
            return Err(ArtifactError::Bytecode {
                id: id.clone(),
                reason: "bytecode is not hex encoded".to_string(),
            });
        }
        let mut code = artifact.bytecode.clone();
        for (source, libraries) in &artifact.link_references {
            for (name, offsets) in libraries {
                let address = self.library(source, name).ok_or_else(|| {
                    ArtifactError::UnlinkedLibrary {
                        id: id.clone(),
                        library: format!("{source}:{name}"),
                    }
                })?;
                let address = hex::encode(address);
                for offset in offsets {
                    let range = hex_range(offset)
                        .filter(|range| {
                            offset.length == size_of::<Address>() && range.end <= code.len()
                        })
                        .ok_or_else(|| ArtifactError::Bytecode {
                            id: id.clone(),
                            reason: format!("invalid link reference for {name}"),
                        })?;
                    code.replace_range(range, &address);
                }
            }
        }

        hex::decode(&code)
            .map(Into::into)
            .map_err(|err| ArtifactError::Bytecode {
                id: id.clone(),
                reason: err.to_string(),
            })
    }
}

impl Build for Registry {
    fn factory(&self, id: &ContractId) -> Result<ContractFactory, ArtifactError> {
        let (id, artifact) = self.find(id)?;
        if let Some(found) = artifact
            .compiler
            .as_ref()
            .filter(|found| **found != self.solidity)
        {
            return Err(ArtifactError::CompilerMismatch {
                id: id.clone(),
                found: found.clone(),
                expected: self.solidity.clone(),
            });
        }

        Ok(ContractFactory {
            id: id.clone(),
            abi: artifact.abi.clone(),
            bytecode: self.link(id, artifact)?,
        })
    }
}

/// Position of a placeholder in the hex encoded bytecode. `None` if the offset
/// doesn't fit in memory.
fn hex_range(offset: &Offset) -> Option<std::ops::Range<usize>> {
    let start = offset.start.checked_mul(2)?;
    let end = offset.start.checked_add(offset.length)?.checked_mul(2)?;
    Some(start..end)
}

/// Fully qualified id, link references and bytecode (without `0x`) of an
/// artifact. Falls back to the file layout when the artifact doesn't name its
/// contract.
fn identify(
    path: &Path,
    contract_name: Option<String>,
    source_name: Option<String>,
    bytecode: BytecodeFile,
    link_references: LinkReferences,
) -> Option<(ContractId, LinkReferences, String)> {
    let name = contract_name.or_else(|| Some(path.file_stem()?.to_str()?.to_string()))?;
    let source =
        source_name.or_else(|| Some(path.parent()?.file_name()?.to_str()?.to_string()))?;
    let (bytecode, link_references) = match bytecode {
        BytecodeFile::Hardhat(bytecode) => (bytecode, link_references),
        BytecodeFile::Foundry {
            object,
            link_references,
        } => (object, link_references),
    };
    let bytecode = bytecode.strip_prefix("0x").unwrap_or(&bytecode).to_string();
    Some((
        ContractId::fully_qualified(&source, &name),
        link_references,
        bytecode,
    ))
}

/// All JSON files below `dir` except debug files and build infos.
async fn artifact_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                if entry.file_name() != "build-info" {
                    pending.push(path);
                }
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".json") && !name.ends_with(".dbg.json") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Reads the solc version from the build info referenced by the artifact's
/// Hardhat debug file. `None` if there is no debug file.
async fn compiler_version(
    artifact: &Path,
    build_infos: &mut HashMap<PathBuf, String>,
) -> anyhow::Result<Option<String>> {
    let debug = artifact.with_extension("dbg.json");
    let data = match fs::read_to_string(&debug).await {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("failed to read {debug:?}")),
    };
    let debug_file: DebugFile = serde_json::from_str(&data)
        .with_context(|| format!("invalid debug file {debug:?}"))?;
    let build_info = artifact
        .parent()
        .unwrap_or(Path::new(""))
        .join(debug_file.build_info);

    if let Some(version) = build_infos.get(&build_info) {
        return Ok(Some(version.clone()));
    }
    let data = fs::read_to_string(&build_info)
        .await
        .with_context(|| format!("failed to read build info {build_info:?}"))?;
    let info: BuildInfo = serde_json::from_str(&data)
        .with_context(|| format!("invalid build info {build_info:?}"))?;
    build_infos.insert(build_info, info.solc_version.clone());
    Ok(Some(info.solc_version))
}
