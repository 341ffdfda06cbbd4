use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, fs, path::Path};
use thiserror::Error;
use tracing::info;

/// the full parameterization of a dispatch, keyed by parameter name
/// BTreeMap keeps key order deterministic across repeated invocations
pub type ParamMap = BTreeMap<String, ParamValue>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read custom parameter file {path}: {source}")]
    CustomRead {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse custom parameter file {path}: {source}")]
    CustomParse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("custom parameter file {0} does not define a `params` mapping")]
    CustomShape(String),
    #[error("required parameter `{0}` is not defined")]
    MissingParam(String),
    #[error("parameter `{key}` must be a scalar {expected}, found {found}")]
    ParamType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// a single parameter value, fully resolved
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
        }
    }
}

impl fmt::Display for Scalar {
    /// textual form used in generated scripts and manifest files
    /// (Python literals for the non-string kinds, matching the parameter file dialect)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

/// a parameter entry: either one scalar, or a list of candidates to sweep over
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(Scalar),
    Sweep(Vec<Scalar>),
}

impl ParamValue {
    pub fn as_sweep(&self) -> Option<&[Scalar]> {
        match self {
            Self::Scalar(_) => None,
            Self::Sweep(values) => Some(values),
        }
    }
}

impl From<Scalar> for ParamValue {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

/// fetch a parameter that must already be scalar (submission-time use)
pub fn scalar<'a>(params: &'a ParamMap, key: &str) -> Result<&'a Scalar, ConfigError> {
    match params.get(key) {
        None => Err(ConfigError::MissingParam(key.to_owned())),
        Some(ParamValue::Sweep(_)) => Err(ConfigError::ParamType {
            key: key.to_owned(),
            expected: "value",
            found: "sweep list",
        }),
        Some(ParamValue::Scalar(value)) => Ok(value),
    }
}

pub fn text<'a>(params: &'a ParamMap, key: &str) -> Result<&'a str, ConfigError> {
    match scalar(params, key)? {
        Scalar::Text(value) => Ok(value),
        other => Err(ConfigError::ParamType {
            key: key.to_owned(),
            expected: "string",
            found: other.kind(),
        }),
    }
}

pub fn int(params: &ParamMap, key: &str) -> Result<i64, ConfigError> {
    match scalar(params, key)? {
        Scalar::Int(value) => Ok(*value),
        other => Err(ConfigError::ParamType {
            key: key.to_owned(),
            expected: "integer",
            found: other.kind(),
        }),
    }
}

/// textual form of a scalar parameter, for interpolation into scripts
pub fn render(params: &ParamMap, key: &str) -> Result<String, ConfigError> {
    scalar(params, key).map(Scalar::to_string)
}

/// command-line overrides; `None` fields were not given and never clobber
/// values from earlier configuration layers
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub lg14_model_id: Option<i64>,
    pub which_test: Option<String>,
    pub nbcpu: Option<i64>,
    pub nb_ch: Option<i64>,
    pub email: Option<String>,
    pub nest_seed: Option<i64>,
    pub python_seed: Option<i64>,
}

/// built-in defaults, initializing all parameters to sensible values
/// (model constants follow the published LG14 parameterization)
pub fn base_params() -> ParamMap {
    let mut params = ParamMap::new();
    let mut set = |key: &str, value: Scalar| {
        params.insert(key.to_owned(), ParamValue::Scalar(value));
    };

    // dispatch-level parameters
    set("LG14modelID", Scalar::Int(9));
    set("whichTest", Scalar::Text("testPlausibility".to_owned()));
    set("nbcpu", Scalar::Int(-1));
    set("nbCh", Scalar::Int(1));
    set("email", Scalar::Text(String::new()));
    set("nestSeed", Scalar::Int(17));
    set("pythonSeed", Scalar::Int(17));

    // resource requests for the batch platforms
    set("durationH", Scalar::Text("08".to_owned()));
    set("durationMin", Scalar::Text("00".to_owned()));
    set("nbnodes", Scalar::Text("4".to_owned()));

    // neuron counts and gains of the simulated circuit
    set("nbMSN", Scalar::Float(2644.));
    set("nbFSI", Scalar::Float(53.));
    set("nbSTN", Scalar::Float(8.));
    set("nbGPe", Scalar::Float(25.));
    set("nbGPi", Scalar::Float(14.));
    set("nbCSN", Scalar::Float(3000.));
    set("nbPTN", Scalar::Float(100.));
    set("nbCMPf", Scalar::Float(9.));
    set("GMSN", Scalar::Float(4.37));
    set("GFSI", Scalar::Float(1.3));
    set("GSTN", Scalar::Float(1.38));
    set("GGPe", Scalar::Float(1.3));
    set("GGPi", Scalar::Float(1.));
    set("IeGPe", Scalar::Float(13.));
    set("IeGPi", Scalar::Float(11.));

    params
}

/// shape of the custom override file: a YAML document with a `params` mapping
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct CustomFile {
    params: ParamMap,
}

/// load the optional custom parameter file, overriding the base parameters
/// any load or shape problem is fatal: no partial merge happens
pub fn load_custom(path: &Path) -> Result<ParamMap, ConfigError> {
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::CustomRead {
        path: display.clone(),
        source,
    })?;

    let document: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::CustomParse {
            path: display.clone(),
            source,
        })?;
    if document.get("params").is_none() {
        return Err(ConfigError::CustomShape(display));
    }

    let custom: CustomFile =
        serde_yaml::from_value(document).map_err(|source| ConfigError::CustomParse {
            path: display,
            source,
        })?;
    Ok(custom.params)
}

/// apply the command-line layer: only the allow-listed keys, only when given
pub fn apply_overrides(params: &mut ParamMap, overrides: &Overrides) {
    let mut set = |key: &str, value: Option<Scalar>| {
        if let Some(value) = value {
            params.insert(key.to_owned(), ParamValue::Scalar(value));
        }
    };

    set("LG14modelID", overrides.lg14_model_id.map(Scalar::Int));
    set(
        "whichTest",
        overrides.which_test.clone().map(Scalar::Text),
    );
    set("nbcpu", overrides.nbcpu.map(Scalar::Int));
    set("nbCh", overrides.nb_ch.map(Scalar::Int));
    set("email", overrides.email.clone().map(Scalar::Text));
    set("nestSeed", overrides.nest_seed.map(Scalar::Int));
    set("pythonSeed", overrides.python_seed.map(Scalar::Int));
}

/// resolve values that stand for "detect at dispatch time"
/// for now only nbcpu < 0, which resolves to the local core count
pub fn expand_values(params: &mut ParamMap) {
    if let Some(ParamValue::Scalar(Scalar::Int(nbcpu))) = params.get("nbcpu") {
        if *nbcpu < 0 {
            let guessed = num_cpus::get() as i64;
            info!(nbcpu = guessed, "using guessed number of CPUs");
            params.insert("nbcpu".to_owned(), ParamValue::Scalar(Scalar::Int(guessed)));
        }
    }
}
