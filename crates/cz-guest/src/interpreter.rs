//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Guest interpreter state owned by the execution token."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use cz_common::GuestConfig;
use cz_logging::{cz_debug, cz_trace, LogContext};
use rhai::module_resolvers::{FileModuleResolver, ModuleResolversCollection};
use rhai::{Dynamic, Engine, EvalAltResult, Map, Scope};

use crate::fault::GuestFault;
use crate::monitor::{self, MonitorRegistry};
use crate::output::OutputSink;

const TAG: &str = "guest";

/// Version of the embedded Rhai engine, as resolved at build time.
pub const ENGINE_VERSION: &str = env!("CZ_RHAI_VERSION");

/// Name of the scope variable holding the driver arguments.
pub const ARGS_VAR: &str = "args";

/// Name of the scope variable holding the active operation object.
pub const OP_VAR: &str = "op";

fn ctx() -> LogContext<'static> {
    LogContext::tagged(TAG).with_service("guest")
}

/// Engine plus the top-level scope that persists between fragments.
///
/// Only ever touched through an [`ExecutionToken`](crate::ExecutionToken).
pub struct GuestInterpreter {
    engine: Engine,
    scope: Scope<'static>,
    search_paths: Vec<PathBuf>,
}

impl GuestInterpreter {
    /// Build an interpreter with the host bindings installed.
    pub fn initialize(config: &GuestConfig, monitors: MonitorRegistry) -> Self {
        let mut engine = Engine::new();
        monitor::register(&mut engine, monitors, config.polling);

        let mut scope = Scope::new();
        let args: Map = config
            .driver_args
            .iter()
            .map(|(k, v)| (k.as_str().into(), Dynamic::from(v.clone())))
            .collect();
        scope.push(ARGS_VAR, args);

        cz_debug!(context = ctx(), "interpreter initialized");
        Self {
            engine,
            scope,
            search_paths: Vec::new(),
        }
    }

    /// Route `print`, `debug`, `stdout()` and `stderr()` to the line-buffered sinks.
    pub fn wire_output(&mut self) {
        self.engine
            .on_print(|text| {
                OutputSink::Stdout.write(text);
                OutputSink::Stdout.write("\n");
            })
            .on_debug(|text, _source, _pos| {
                OutputSink::Stderr.write(unquote(text));
                OutputSink::Stderr.write("\n");
            });

        self.engine
            .register_type_with_name::<OutputSink>("OutputStream")
            .register_fn("stdout", || OutputSink::Stdout)
            .register_fn("stderr", || OutputSink::Stderr)
            .register_fn("write", |sink: &mut OutputSink, text: &str| sink.write(text))
            .register_fn("flush", |sink: &mut OutputSink| sink.flush());
    }

    /// Make every attempt to read standard input fail.
    pub fn disable_input(&mut self) {
        self.engine
            .register_fn("read_line", || -> Result<String, Box<EvalAltResult>> {
                Err("standard input is disabled".into())
            });
    }

    /// Append directories searched by `import`, after the existing ones.
    pub fn append_search_paths<P: AsRef<Path>>(&mut self, paths: &[P]) {
        for path in paths {
            let path = path.as_ref().to_path_buf();
            if self.search_paths.contains(&path) {
                continue;
            }
            cz_debug!(context = ctx(), "script search path {}", path.display());
            self.search_paths.push(path);
        }

        let mut resolvers = ModuleResolversCollection::new();
        for path in &self.search_paths {
            resolvers.push(FileModuleResolver::new_with_path(path));
        }
        self.engine.set_module_resolver(resolvers);
    }

    /// Run a fragment against the persistent scope.
    ///
    /// A guest error is rendered, reported and returned; the interpreter stays
    /// usable afterwards.
    pub fn run_fragment(&mut self, fragment: &str) -> Result<(), GuestFault> {
        cz_trace!(context = ctx(), "running fragment: {}", fragment);
        self.engine
            .run_with_scope(&mut self.scope, fragment)
            .map_err(|err| {
                let fault = GuestFault::from_eval(&err);
                fault.report();
                fault
            })
    }

    /// Copy of a top-level variable, if it exists with type `T`.
    pub fn variable<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<T> {
        self.scope.get_value::<T>(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.scope.contains(name)
    }

    /// Tear down: flush this thread's partial output lines and drop guest state.
    pub fn finalize(self) {
        OutputSink::flush_all();
        cz_debug!(context = ctx(), "interpreter finalized");
    }
}

/// `debug()` hands over the debug form of its argument, which quotes strings.
fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
}
