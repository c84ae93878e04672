//! Compiled contracts and the factories that turn them into deployment code.

use {
    alloy::{
        dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
        json_abi::JsonAbi,
        primitives::Bytes,
    },
    std::fmt,
};

/// Identifies a contract either by its bare name (`AuctionManager`) or by its
/// fully qualified name (`contracts/AuctionManager.sol:AuctionManager`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn fully_qualified(source: &str, name: &str) -> Self {
        Self(format!("{source}:{name}"))
    }

    /// The contract name without the source path.
    pub fn name(&self) -> &str {
        self.0.rsplit_once(':').map_or(&self.0, |(_, name)| name)
    }

    pub fn is_fully_qualified(&self) -> bool {
        self.0.contains(':')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Capability to build the deployment transaction of one compiled contract.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    pub id: ContractId,
    pub abi: JsonAbi,
    /// Linked creation bytecode.
    pub bytecode: Bytes,
}

impl ContractFactory {
    /// The input of the contract creation transaction: the creation bytecode
    /// followed by the ABI encoded constructor arguments.
    ///
    /// Arguments are given as strings and coerced into the types the
    /// constructor declares, e.g. `"42"` for a `uint256` or a hex string for an
    /// `address`.
    pub fn deploy_code(&self, args: &[String]) -> Result<Bytes, ConstructorError> {
        let Some(constructor) = &self.abi.constructor else {
            return match args.len() {
                0 => Ok(self.bytecode.clone()),
                actual => Err(ConstructorError::Arity {
                    expected: 0,
                    actual,
                }),
            };
        };
        if constructor.inputs.len() != args.len() {
            return Err(ConstructorError::Arity {
                expected: constructor.inputs.len(),
                actual: args.len(),
            });
        }

        let values = constructor
            .inputs
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (param, arg))| {
                param
                    .resolve()
                    .and_then(|ty| ty.coerce_str(arg))
                    .map_err(|source| ConstructorError::Coerce {
                        index,
                        ty: param.ty.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<DynSolValue>, _>>()?;
        let encoded = constructor
            .abi_encode_input(&values)
            .map_err(ConstructorError::Encode)?;

        Ok([&self.bytecode[..], &encoded[..]].concat().into())
    }
}

/// The build collaborator: hands out factories for compiled contracts.
#[cfg_attr(test, mockall::automock)]
pub trait Build: Send + Sync {
    fn factory(&self, id: &ContractId) -> Result<ContractFactory, ArtifactError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("no compiled artifact found for {0}, was the contract compiled?")]
    Missing(ContractId),
    #[error("{id} matches several contracts, use a fully qualified name: {candidates:?}")]
    Ambiguous {
        id: ContractId,
        candidates: Vec<ContractId>,
    },
    #[error("{id} links against library {library} but no address is configured for it")]
    UnlinkedLibrary { id: ContractId, library: String },
    #[error("{id} was compiled with solc {found}, expected {expected}")]
    CompilerMismatch {
        id: ContractId,
        found: String,
        expected: String,
    },
    #[error("{id} has malformed bytecode: {reason}")]
    Bytecode { id: ContractId, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConstructorError {
    #[error("constructor takes {expected} arguments but {actual} were configured")]
    Arity { expected: usize, actual: usize },
    #[error("constructor argument {index} is not a valid {ty}")]
    Coerce {
        index: usize,
        ty: String,
        #[source]
        source: alloy::dyn_abi::Error,
    },
    #[error("failed to encode constructor arguments")]
    Encode(#[source] alloy::dyn_abi::Error),
}
