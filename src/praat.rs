//! The host-facing session.
//!
//! A [`Praat`] owns the object arena, the diagnostics streams, the random
//! generator and the configuration. Every call or script run lends the
//! requested objects to a fresh [`Environment`], works on it, and gives the
//! objects back on every exit path, errors and caught crashes included.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::commands::dispatch;
use crate::config::Config;
use crate::diagnostics::{Melder, Warning, WarningPolicy};
use crate::error::{praat_bail, Error, Result};
use crate::interpreter::{Script, Val};
use crate::objects::{Environment, Handle, ObjectTable, Thing};
use crate::persist;
use crate::value::{Outcome, Value};

/// Options for [`Praat::call_with`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Return whatever the command wrote to the info window, as text.
    pub return_string: bool,
}

/// Options for [`Praat::run_with`] and [`Praat::run_file`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Capture info output instead of writing it to the console.
    pub capture_output: bool,
    /// Return the script's variables when it ends.
    pub return_variables: bool,
    /// Without arguments, fill the form with its defaults.
    pub use_defaults: bool,
    /// Objects to put in the list without selecting them.
    pub extra_objects: Vec<Handle>,
    /// For script files: stay in the current directory instead of the
    /// script's own.
    pub keep_cwd: bool,
}

/// What a script run hands back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    /// Objects selected when the script ended.
    pub objects: Vec<Handle>,
    /// Captured info output, when asked for.
    pub output: Option<String>,
    /// Final variables by name (suffix included), when asked for.
    pub variables: Option<BTreeMap<String, Value>>,
}

/// One engine session.
#[derive(Debug)]
pub struct Praat {
    table: ObjectTable,
    melder: Melder,
    rng: StdRng,
    config: Config,
}

impl Default for Praat {
    fn default() -> Self {
        Self::new()
    }
}

impl Praat {
    /// A session with default configuration, writing to stdout and stderr.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// A session configured from `PRAATFAN_BRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(Config::from_env()?))
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_melder(config, Melder::default())
    }

    /// A session with its own output streams.
    pub fn with_melder(config: Config, mut melder: Melder) -> Self {
        melder.set_policy(config.warnings);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            table: ObjectTable::new(),
            melder,
            rng,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_warning_policy(&mut self, policy: WarningPolicy) {
        self.config.warnings = policy;
        self.melder.set_policy(policy);
    }

    /// Reseed the random generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Warnings recorded since the last [`take_warnings`](Self::take_warnings).
    pub fn warnings(&self) -> &[Warning] {
        self.melder.warnings()
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.melder.take_warnings()
    }

    // ========== Objects ==========

    pub fn insert(&mut self, thing: Thing) -> Handle {
        self.table.insert(thing)
    }

    pub fn get(&self, handle: Handle) -> Result<&Thing> {
        self.table.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Thing> {
        self.table.get_mut(handle)
    }

    pub fn remove(&mut self, handle: Handle) -> Result<Thing> {
        self.table.remove(handle)
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.table
    }

    pub fn set_name(&mut self, handle: Handle, name: Option<&str>) -> Result<()> {
        self.table.get_mut(handle)?.set_name(name);
        Ok(())
    }

    /// `"Class name"`, as scripts refer to the object.
    pub fn full_name(&self, handle: Handle) -> Result<String> {
        Ok(self.table.get(handle)?.full_name())
    }

    pub fn info(&self, handle: Handle) -> Result<String> {
        Ok(self.table.get(handle)?.info())
    }

    // ========== Files ==========

    /// Read a file holding exactly one object.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<Handle> {
        let path = path.as_ref();
        let mut things = persist::read_file(path)?;
        if things.len() != 1 {
            praat_bail!(
                "File “{}” contains {} objects; read it as a list instead.",
                path.display(),
                things.len()
            );
        }
        let thing = things.remove(0);
        Ok(self.table.insert(thing))
    }

    /// Read every object in a file, in file order.
    pub fn read_all(&mut self, path: impl AsRef<Path>) -> Result<Vec<Handle>> {
        let things = persist::read_file(path)?;
        Ok(things.into_iter().map(|t| self.table.insert(t)).collect())
    }

    /// Save objects as a text file; several objects make a Collection.
    pub fn save(&self, handles: &[Handle], path: impl AsRef<Path>) -> Result<()> {
        let things = handles
            .iter()
            .map(|&h| self.table.get(h))
            .collect::<Result<Vec<_>>>()?;
        persist::save_text_file(path, &things)
    }

    // ========== Commands ==========

    /// Run command `name` with `objects` selected.
    pub fn call(&mut self, objects: &[Handle], name: &str, args: &[Value]) -> Result<Outcome> {
        self.call_with(objects, name, args, &CallOptions::default())
    }

    pub fn call_with(&mut self, objects: &[Handle], name: &str, args: &[Value], options: &CallOptions) -> Result<Outcome> {
        let mut env = Environment::adopt(&mut self.table, objects)?;
        let result = dispatch(&mut env, &mut self.melder, &mut self.rng, None, name, args, true);
        match result {
            Ok(reply) => {
                let handles = env.finish_new(&mut self.table);
                if options.return_string {
                    Ok(Outcome::Text(reply.info))
                } else {
                    Ok(reply.into_outcome(handles))
                }
            }
            Err(e) => {
                env.finish(&mut self.table);
                Err(e)
            }
        }
    }

    // ========== Scripts ==========

    /// Run script source with `objects` selected.
    pub fn run(&mut self, objects: &[Handle], script: &str, args: &[Value]) -> Result<RunResult> {
        self.run_with(objects, script, args, &RunOptions::default())
    }

    pub fn run_with(&mut self, objects: &[Handle], script: &str, args: &[Value], options: &RunOptions) -> Result<RunResult> {
        let script = Script::parse(script).map_err(|e| e.context("Script not completed."))?;
        self.execute(objects, &script, args, options)
    }

    /// Run a script file. Unless `keep_cwd` is set, the working directory is
    /// the script's own while it runs.
    pub fn run_file(
        &mut self,
        objects: &[Handle],
        path: impl AsRef<Path>,
        args: &[Value],
        options: &RunOptions,
    ) -> Result<RunResult> {
        let path = path.as_ref();
        let script = Script::load(path).map_err(|e| e.context("Script not completed."))?;
        let _cwd = match (options.keep_cwd, path.parent()) {
            (false, Some(dir)) if !dir.as_os_str().is_empty() => Some(CwdGuard::enter(dir)?),
            _ => None,
        };
        self.execute(objects, &script, args, options)
    }

    fn execute(&mut self, objects: &[Handle], script: &Script, args: &[Value], options: &RunOptions) -> Result<RunResult> {
        let all: Vec<Handle> = objects.iter().chain(&options.extra_objects).copied().collect();
        let mut env = Environment::adopt(&mut self.table, &all)?;
        for id in objects.len() + 1..=all.len() {
            env.minus(id)?;
        }

        if options.capture_output {
            self.melder.divert();
        }
        let result = script.run(&mut env, &mut self.melder, &mut self.rng, args, options.use_defaults);
        let output = options.capture_output.then(|| self.melder.undivert());
        let selected = env.finish(&mut self.table);

        let variables = result?;
        Ok(RunResult {
            objects: selected,
            output,
            variables: options.return_variables.then(|| {
                variables
                    .into_iter()
                    .map(|(name, value)| (name, Val::into_value(value)))
                    .collect()
            }),
        })
    }
}

/// Restores the previous working directory when dropped.
struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &Path) -> Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir).map_err(|e| Error::praat(format!("Cannot change to folder “{}”: {}", dir.display(), e)))?;
        Ok(Self { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            log::warn!("could not restore working directory {}: {}", self.previous.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SharedBuffer;
    use crate::sound::Sound;

    fn session() -> (Praat, SharedBuffer) {
        let console = SharedBuffer::new();
        let melder = Melder::new(Box::new(console.clone()), Box::new(SharedBuffer::new()));
        let config = Config {
            seed: Some(1),
            ..Config::default()
        };
        (Praat::with_melder(config, melder), console)
    }

    fn tone(praat: &mut Praat) -> Handle {
        praat.insert(Thing::new(Sound::from_slice(&vec![0.25; 1000], 1000.0), Some("tone")))
    }

    #[test]
    fn call_returns_numbers_and_objects() {
        let (mut praat, _) = session();
        let sound = tone(&mut praat);
        let n = praat.call(&[sound], "Get number of samples", &[]).unwrap();
        assert_eq!(n, Outcome::Integer(1000));
        let part = praat
            .call(&[sound], "Extract part", &[Value::Number(0.0), Value::Number(0.5)])
            .unwrap()
            .as_object()
            .unwrap();
        assert_eq!(praat.full_name(part).unwrap(), "Sound \"tone_part\"");
        assert_eq!(praat.objects().len(), 2);
    }

    #[test]
    fn objects_come_back_after_errors() {
        let (mut praat, _) = session();
        let sound = tone(&mut praat);
        let err = praat.call(&[sound], "Get mean", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Command \"Get mean\" not available for given objects.");
        assert!(praat.get(sound).is_ok());
    }

    #[test]
    fn return_string_gives_info_text() {
        let (mut praat, _) = session();
        let sound = tone(&mut praat);
        let options = CallOptions { return_string: true };
        let text = praat.call_with(&[sound], "Get sampling frequency", &[], &options).unwrap();
        assert_eq!(text, Outcome::Text("1000 Hz\n".into()));
    }

    #[test]
    fn captured_output_and_variables() {
        let (mut praat, console) = session();
        let options = RunOptions {
            capture_output: true,
            return_variables: true,
            ..RunOptions::default()
        };
        let result = praat
            .run_with(&[], "writeInfo: \"X\"\nappendInfo: \"Y\"\ns$ = \"z\"\n", &[], &options)
            .unwrap();
        assert_eq!(result.output.as_deref(), Some("XY"));
        assert_eq!(console.contents(), "");
        let variables = result.variables.unwrap();
        assert_eq!(variables.get("s$"), Some(&Value::String("z".into())));
    }

    #[test]
    fn extra_objects_are_listed_but_not_selected() {
        let (mut praat, _) = session();
        let a = tone(&mut praat);
        let b = tone(&mut praat);
        let options = RunOptions {
            extra_objects: vec![b],
            ..RunOptions::default()
        };
        let result = praat.run_with(&[a], "plusObject: 2\n", &[], &options).unwrap();
        assert_eq!(result.objects, vec![a, b]);
        let result = praat.run_with(&[a], "", &[], &options).unwrap();
        assert_eq!(result.objects, vec![a]);
    }

    #[test]
    fn crashed_call_leaves_the_session_usable() {
        let (mut praat, _) = session();
        let sound = tone(&mut praat);
        let err = praat.call(&[sound], "Crash", &[]).unwrap_err();
        assert!(err.is_crash());
        assert!(err.to_string().starts_with("Sound \"tone\" has an impossible shape\n"));
        assert!(err.to_string().ends_with(crate::error::RESTART_ADVICE));

        assert_eq!(praat.objects().len(), 1);
        let n = praat.call(&[sound], "Get number of samples", &[]).unwrap();
        assert_eq!(n, Outcome::Integer(1000));
    }

    #[test]
    fn crash_inside_a_script_returns_every_object() {
        let (mut praat, console) = session();
        let a = tone(&mut praat);
        let b = tone(&mut praat);
        let options = RunOptions {
            capture_output: true,
            ..RunOptions::default()
        };
        let script = "writeInfo: \"before\"\nselectObject: 2\nCrash\n";
        let err = praat.run_with(&[a, b], script, &[], &options).unwrap_err();
        assert!(err.is_crash());

        assert_eq!(praat.objects().len(), 2);
        assert!(praat.get(a).is_ok() && praat.get(b).is_ok());
        // The capture was closed, so later output reaches the console again
        praat.run(&[], "writeInfo: \"after\"", &[]).unwrap();
        assert_eq!(console.contents(), "after");
        let result = praat.run_with(&[a, b], "minusObject: 1\n", &[], &options).unwrap();
        assert_eq!(result.objects, vec![b]);
    }

    #[test]
    fn save_and_read_collection() {
        let (mut praat, _) = session();
        let a = tone(&mut praat);
        let b = tone(&mut praat);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("both.Collection");
        praat.save(&[a, b], &path).unwrap();
        let read = praat.read_all(&path).unwrap();
        assert_eq!(read.len(), 2);
        assert!(praat.read(&path).is_err());
    }
}
