//! The templated query manager component.
//!
//! Settings arrive as config promises while the container populates, and the
//! template files load when the container starts the component. Lookups and
//! expansion are read-only afterwards and safe for concurrent use.

use crate::error::QueryError;
use crate::template::{QueryTemplate, TemplateBuilder};
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use plinth_config::value::{kind_of, ConfigValue};
use plinth_ioc::component::{
    ComponentInstance, ComponentState, ErrorPtr, Setting, Startable, Wirable,
};
use plinth_ioc::error::WiringError;
use plinth_ioc::proto::ProtoComponent;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// Variable pattern matched in template bodies unless configured otherwise:
/// a `${...}` wrapped token, captured without the delimiters.
pub const DEFAULT_VAR_PATTERN: &str = r"\$\{([^\}]+)\}";

/// Line prefix that begins a new template unless configured otherwise.
pub const DEFAULT_ID_PREFIX: &str = "ID:";

/// Registered name of the query manager facility component.
pub const QUERY_MANAGER_COMPONENT: &str = "plinthQueryManager";

/// Parameters supplied when expanding a template, keyed by variable name.
pub type QueryParams = FxHashMap<String, ConfigValue>;

/// Combines loaded query templates with parameters to produce executable
/// query strings.
pub trait QueryManager: Send + Sync {
    fn build_query_from_id(&self, qid: &str, params: &QueryParams) -> Result<String, QueryError>;

    /// Expands a template that takes no parameters. Resolved fragments are
    /// cached.
    fn fragment_from_id(&self, qid: &str) -> Result<String, QueryError>;
}

/// Errors preventing the query manager from starting.
#[derive(Error, Debug)]
pub enum TemplateLoadError {
    #[error("no template location has been configured")]
    MissingLocation,

    #[error("the configured variable pattern does not compile: {source}")]
    BadPattern {
        #[source]
        source: regex::Error,
    },

    #[error("unable to list query files under {path}: {source}")]
    TemplateDirectory {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// The standard [QueryManager]: loads templates from plain-text files under a
/// configured directory.
#[derive(Default)]
pub struct TemplatedQueryManager {
    template_location: Setting<String>,
    var_match_regex: Setting<String>,
    query_id_prefix: Setting<String>,
    trim_id_white_space: Setting<bool>,
    templates: RwLock<FxHashMap<String, QueryTemplate>>,
    fragments: Mutex<FxHashMap<String, String>>,
    state: RwLock<ComponentState>,
}

impl TemplatedQueryManager {
    /// Creates a manager reading templates from `location`, with default
    /// marker and variable pattern. The container-managed path supplies the
    /// same settings through config promises instead.
    pub fn with_location(location: impl Into<String>) -> Self {
        let manager = Self::default();
        let _ = manager.template_location.set(location.into());
        manager
    }

    fn load_templates(&self) -> Result<usize, TemplateLoadError> {
        let location = self
            .template_location
            .get()
            .cloned()
            .ok_or(TemplateLoadError::MissingLocation)?;

        debug!(location = location.as_str(), "starting query manager");

        let pattern = self
            .var_match_regex
            .cloned_or(DEFAULT_VAR_PATTERN.to_string());
        let matcher =
            Regex::new(&pattern).map_err(|source| TemplateLoadError::BadPattern { source })?;

        let id_prefix = self.query_id_prefix.cloned_or(DEFAULT_ID_PREFIX.to_string());
        let trim_ids = self.trim_id_white_space.cloned_or(true);

        let files = file_list(Path::new(&location)).map_err(|source| {
            TemplateLoadError::TemplateDirectory {
                path: location.clone(),
                source,
            }
        })?;

        let mut templates = FxHashMap::default();

        for path in files {
            debug!(file = %path.display(), "parsing query file");

            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(reason) => {
                    error!("unable to open {} for parsing: {reason}", path.display());
                    continue;
                }
            };

            scan_lines(&contents, &matcher, &id_prefix, trim_ids, &mut templates);
        }

        let count = templates.len();
        *self.templates.write() = templates;

        Ok(count)
    }
}

impl ComponentInstance for TemplatedQueryManager {
    fn as_wirable(&self) -> Option<&dyn Wirable> {
        Some(self)
    }

    fn as_startable(&self) -> Option<&dyn Startable> {
        Some(self)
    }
}

impl Wirable for TemplatedQueryManager {
    fn set_config(&self, field: &str, value: &ConfigValue) -> Result<(), WiringError> {
        match field {
            "templateLocation" => self.template_location.apply(value),
            "varMatchRegex" => self.var_match_regex.apply(value),
            "queryIdPrefix" => self.query_id_prefix.apply(value),
            "trimIdWhiteSpace" => self.trim_id_white_space.apply(value),
            other => Err(WiringError::UnknownField(other.to_string())),
        }
    }
}

impl Startable for TemplatedQueryManager {
    fn start_component(&self) -> Result<(), ErrorPtr> {
        {
            let mut state = self.state.write();
            if *state != ComponentState::Stopped {
                return Ok(());
            }
            *state = ComponentState::Starting;
        }

        match self.load_templates() {
            Ok(count) => {
                *self.state.write() = ComponentState::Running;
                debug!("started query manager with {count} queries");
                Ok(())
            }
            Err(reason) => {
                *self.state.write() = ComponentState::Stopped;
                Err(Arc::new(reason) as ErrorPtr)
            }
        }
    }
}

impl QueryManager for TemplatedQueryManager {
    fn build_query_from_id(&self, qid: &str, params: &QueryParams) -> Result<String, QueryError> {
        let templates = self.templates.read();

        let template = templates
            .get(qid)
            .ok_or_else(|| QueryError::UnknownQuery(qid.to_string()))?;

        let query = expand(template, params)?;
        trace!(query = query.as_str(), "built query");

        Ok(query)
    }

    fn fragment_from_id(&self, qid: &str) -> Result<String, QueryError> {
        if let Some(cached) = self.fragments.lock().get(qid) {
            return Ok(cached.clone());
        }

        let built = self.build_query_from_id(qid, &QueryParams::default())?;
        self.fragments.lock().insert(qid.to_string(), built.clone());

        Ok(built)
    }
}

/// Proto for the query manager facility, its settings promised from the
/// framework section of the merged configuration.
pub fn query_manager_proto() -> ProtoComponent {
    ProtoComponent::new(QUERY_MANAGER_COMPONENT, TemplatedQueryManager::default())
        .with_config("templateLocation", "plinth.queryManager.templateLocation")
        .with_config("varMatchRegex", "plinth.queryManager.varMatchRegex")
        .with_config("queryIdPrefix", "plinth.queryManager.queryIdPrefix")
        .with_config("trimIdWhiteSpace", "plinth.queryManager.trimIdWhiteSpace")
}

fn scan_lines(
    contents: &str,
    matcher: &Regex,
    id_prefix: &str,
    trim_ids: bool,
    templates: &mut FxHashMap<String, QueryTemplate>,
) {
    let mut current: Option<TemplateBuilder> = None;

    for line in contents.lines() {
        if let Some(remainder) = line.strip_prefix(id_prefix) {
            if let Some(finished) = current.take() {
                store_template(templates, finished.finish());
            }

            let id = if trim_ids { remainder.trim() } else { remainder };
            current = Some(TemplateBuilder::new(id));
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        let Some(builder) = current.as_mut() else {
            debug!("ignoring body line outside any template");
            continue;
        };

        tokenise_line(line, matcher, builder);
        builder.end_line();
    }

    if let Some(finished) = current.take() {
        store_template(templates, finished.finish());
    }
}

fn store_template(templates: &mut FxHashMap<String, QueryTemplate>, template: QueryTemplate) {
    if templates.contains_key(&template.id) {
        warn!(
            id = template.id.as_str(),
            "duplicate query id overwrites earlier template"
        );
    }

    templates.insert(template.id.clone(), template);
}

/// Splits one body line into interleaved fragments and variables, in source
/// order. A line starting with a variable yields no leading fragment.
fn tokenise_line(line: &str, matcher: &Regex, builder: &mut TemplateBuilder) {
    let mut last = 0;

    for captures in matcher.captures_iter(line) {
        let Some(full) = captures.get(0) else {
            continue;
        };

        let token = captures
            .get(1)
            .map(|group| group.as_str())
            .unwrap_or_default();

        if full.start() > last {
            builder.add_fragment(&line[last..full.start()]);
        }

        builder.add_var(token);
        last = full.end();
    }

    if last < line.len() {
        builder.add_fragment(&line[last..]);
    }
}

fn expand(template: &QueryTemplate, params: &QueryParams) -> Result<String, QueryError> {
    use crate::template::QueryToken;

    let mut output = String::new();

    for token in &template.tokens {
        match token {
            QueryToken::Fragment(text) => output.push_str(text),
            QueryToken::NamedVar(name) => {
                output.push_str(&parameter_text(&template.id, name, params)?)
            }
            QueryToken::IndexedVar(index) => {
                output.push_str(&parameter_text(&template.id, &index.to_string(), params)?)
            }
        }
    }

    Ok(output)
}

fn parameter_text(query: &str, name: &str, params: &QueryParams) -> Result<String, QueryError> {
    let value = params
        .get(name)
        .ok_or_else(|| QueryError::MissingParameter {
            query: query.to_string(),
            parameter: name.to_string(),
        })?;

    match value {
        ConfigValue::String(text) => Ok(text.clone()),
        ConfigValue::Null => Ok(String::new()),
        ConfigValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(int.to_string())
            } else if let Some(int) = number.as_u64() {
                Ok(int.to_string())
            } else {
                Err(QueryError::UnsupportedParamType {
                    parameter: name.to_string(),
                    kind: "floating-point number",
                })
            }
        }
        other => Err(QueryError::UnsupportedParamType {
            parameter: name.to_string(),
            kind: kind_of(other),
        }),
    }
}

/// Every file under `root`, recursively, in sorted order.
fn file_list(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}
