//! Library family session: discovery, probe, bind, cache.
//!
//! Discovery walks the known-good version combinations newest-first. For
//! each combination every module is opened, probed, checked for version
//! consistency, and bound; the first combination that fully binds is kept
//! for the life of the session. Any failure abandons the whole combination,
//! unloads whatever was opened, and moves on to the next one.
//!
//! Nothing in here throws raw native codes at the caller. A failed
//! discovery is reported as [`DiscoveryError`] carrying the ordered textual
//! attempt log, which is the only useful diagnostic when a machine has a
//! partial or mismatched install.

#![expect(
    unsafe_code,
    reason = "the version probe calls a resolved native entry point"
)]

use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::error::{BindError, DiscoveryError, LoadError, RegistryFull};
use crate::loader::{self, RawSymbol, SymbolSource};
use crate::logsink::{LogSink, SinkRegistry, SinkSlot};
use crate::tables::{CodecTable, FormatTable, ResampleTable, UtilTable, VersionFn};
use crate::version::{ModuleKind, Version, VersionCombo, VERSION_COMBOS};

/// Diagnostics for one bound module.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Which module this is.
    pub kind: ModuleKind,
    /// Resolved file path the module was opened from.
    pub path: PathBuf,
    /// The module's self-reported version.
    pub version: Version,
}

impl std::fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.version, self.path.display())
    }
}

/// One opened-and-probed module candidate.
pub struct OpenedModule {
    /// Symbol source backing the module; kept alive for as long as any
    /// bound function pointer may be called.
    pub source: Box<dyn SymbolSource + Send + Sync>,
    /// Where the module was opened from.
    pub path: PathBuf,
    /// Self-reported version, decoded from the packed probe integer.
    pub version: Version,
}

/// Opens and probes module candidates.
///
/// Discovery drives this seam so the whole walk can be exercised against
/// scripted installs in tests; the native implementation is
/// [`NativeOpener`].
pub trait ModuleOpener {
    /// Open the best candidate for `kind` at `major` and probe its version,
    /// appending every attempt to `log`.
    fn open(
        &self,
        kind: ModuleKind,
        major: u32,
        log: &mut Vec<String>,
    ) -> Result<OpenedModule, LoadError>;
}

/// The real opener: `dlopen` over the configured search directories plus
/// the platform default path.
pub struct NativeOpener {
    dirs: Vec<PathBuf>,
}

impl NativeOpener {
    /// Opener over an explicit directory list.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Opener configured from a [`DiscoveryConfig`].
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(loader::search_dirs(config))
    }
}

impl ModuleOpener for NativeOpener {
    fn open(
        &self,
        kind: ModuleKind,
        major: u32,
        log: &mut Vec<String>,
    ) -> Result<OpenedModule, LoadError> {
        let lib = loader::open_module(kind, major, &self.dirs, log)?;
        let path = lib.path().to_path_buf();
        let symbol = kind.version_symbol();
        let Some(raw) = lib.symbol(symbol) else {
            log.push(format!("{kind}: probe entry point `{symbol}` missing"));
            return Err(LoadError::ProbeSymbolMissing {
                module: kind,
                path,
                symbol,
            });
        };
        // Safety: the probe entry point takes no arguments and returns the
        // packed version integer; that contract predates every supported
        // generation.
        let version_fn = unsafe { mem::transmute_copy::<RawSymbol, VersionFn>(&raw) };
        let version = Version::from_packed(unsafe { version_fn() });
        log.push(format!("probed {kind} at {}: {version}", path.display()));
        Ok(OpenedModule {
            source: Box::new(lib),
            path,
            version,
        })
    }
}

/// One module retained by a session: diagnostics, the bound table, and the
/// live library handle the table's pointers point into.
pub struct BoundModule<T> {
    /// Name, path, and probed version.
    pub info: ModuleInfo,
    /// The bound function table.
    pub table: T,
    _source: Box<dyn SymbolSource + Send + Sync>,
}

/// A fully bound four-module install.
///
/// Field order is the reverse of bind order, so teardown releases handles
/// in reverse.
pub struct LibraryFamily {
    resample: BoundModule<ResampleTable>,
    codec: BoundModule<CodecTable>,
    format: BoundModule<FormatTable>,
    util: BoundModule<UtilTable>,
    combo: VersionCombo,
    attempt_log: Vec<String>,
}

impl std::fmt::Debug for LibraryFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryFamily")
            .field("combo", &self.combo)
            .field("attempt_log", &self.attempt_log)
            .finish_non_exhaustive()
    }
}

impl LibraryFamily {
    /// The version combination that bound.
    pub fn combo(&self) -> VersionCombo {
        self.combo
    }

    /// Diagnostics for one module.
    pub fn info(&self, kind: ModuleKind) -> &ModuleInfo {
        match kind {
            ModuleKind::Format => &self.format.info,
            ModuleKind::Codec => &self.codec.info,
            ModuleKind::Util => &self.util.info,
            ModuleKind::Resample => &self.resample.info,
        }
    }

    /// Container-format entry points.
    pub fn format_table(&self) -> &FormatTable {
        &self.format.table
    }

    /// Codec entry points.
    pub fn codec_table(&self) -> &CodecTable {
        &self.codec.table
    }

    /// Shared-utility entry points.
    pub fn util_table(&self) -> &UtilTable {
        &self.util.table
    }

    /// Resampler entry points.
    pub fn resample_table(&self) -> &ResampleTable {
        &self.resample.table
    }

    /// The full ordered load-attempt log of the discovery that bound this
    /// family, including the final success line.
    pub fn attempt_log(&self) -> &[String] {
        &self.attempt_log
    }

    /// Route the family's native log traffic through `sink`.
    ///
    /// The returned slot claims one of the bounded trampoline identities;
    /// keep it alive for as long as the family may emit log lines.
    pub fn install_log_sink(
        &self,
        registry: &SinkRegistry,
        sink: LogSink,
    ) -> Result<SinkSlot, RegistryFull> {
        let slot = registry.register(sink)?;
        // Safety: the bound entry point installs the process-wide native
        // log callback; the trampoline stays valid for the program's life.
        unsafe { (self.util.table.log_set_callback)(Some(slot.native_callback())) };
        Ok(slot)
    }
}

/// Walk the known-good combinations newest-first and bind the first one
/// that holds together.
pub fn run_discovery(opener: &dyn ModuleOpener) -> Result<LibraryFamily, DiscoveryError> {
    let mut log = Vec::new();
    for combo in VERSION_COMBOS {
        // Each attempt starts clean; modules opened by a failed attempt are
        // dropped when the attempt's partial state goes out of scope.
        log.push(format!("unload libraries, trying combination {combo}"));
        match try_combo(opener, *combo, &mut log) {
            Ok(mut family) => {
                let line = format!(
                    "bound {} / {} / {} / {}",
                    family.format.info, family.codec.info, family.util.info, family.resample.info
                );
                info!(combo = %combo, "library family bound");
                log.push(line);
                family.attempt_log = log;
                return Ok(family);
            }
            Err(e) => {
                debug!(combo = %combo, "combination rejected: {e:#}");
                log.push(format!("combination {combo} rejected: {e:#}"));
            }
        }
    }
    warn!("no known version combination bound");
    Err(DiscoveryError { attempts: log })
}

/// Open, probe, consistency-check, and bind all four modules for one
/// combination.
fn try_combo(
    opener: &dyn ModuleOpener,
    combo: VersionCombo,
    log: &mut Vec<String>,
) -> anyhow::Result<LibraryFamily> {
    // Bind order: util first (everything depends on it), resampler last.
    let util = open_checked(opener, ModuleKind::Util, combo, log)?;
    let format = open_checked(opener, ModuleKind::Format, combo, log)?;
    let codec = open_checked(opener, ModuleKind::Codec, combo, log)?;
    let resample = open_checked(opener, ModuleKind::Resample, combo, log)?;

    Ok(LibraryFamily {
        resample: bind_module(resample, ModuleKind::Resample, |s| {
            ResampleTable::bind(s, combo.resample)
        })?,
        codec: bind_module(codec, ModuleKind::Codec, |s| CodecTable::bind(s, combo.codec))?,
        format: bind_module(format, ModuleKind::Format, |s| {
            FormatTable::bind(s, combo.format)
        })?,
        util: bind_module(util, ModuleKind::Util, |s| UtilTable::bind(s, combo.util))?,
        combo,
        attempt_log: Vec::new(),
    })
}

fn open_checked(
    opener: &dyn ModuleOpener,
    kind: ModuleKind,
    combo: VersionCombo,
    log: &mut Vec<String>,
) -> anyhow::Result<OpenedModule> {
    let expected = combo.major_of(kind);
    let opened = opener
        .open(kind, expected, log)
        .with_context(|| format!("opening {kind}"))?;
    if opened.version.major != expected {
        return Err(BindError::VersionMismatch {
            module: kind,
            expected,
            found: opened.version,
        }
        .into());
    }
    Ok(opened)
}

fn bind_module<T>(
    opened: OpenedModule,
    kind: ModuleKind,
    bind: impl FnOnce(&dyn SymbolSource) -> Result<T, BindError>,
) -> anyhow::Result<BoundModule<T>> {
    let table = bind(opened.source.as_ref()).with_context(|| format!("binding {kind}"))?;
    Ok(BoundModule {
        info: ModuleInfo {
            kind,
            path: opened.path,
            version: opened.version,
        },
        table,
        _source: opened.source,
    })
}

/// One cached bound family, shared across callers until a forced reload.
pub struct SessionCache {
    slot: Mutex<Option<Arc<LibraryFamily>>>,
}

impl SessionCache {
    /// An empty cache.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the cached family, or run discovery through `opener` and
    /// cache the result. `force_reload` discards any cached family first.
    pub fn obtain_with(
        &self,
        opener: &dyn ModuleOpener,
        force_reload: bool,
    ) -> Result<Arc<LibraryFamily>, DiscoveryError> {
        let mut slot = self.slot.lock();
        if force_reload {
            *slot = None;
        }
        if let Some(family) = slot.as_ref() {
            return Ok(Arc::clone(family));
        }
        let family = Arc::new(run_discovery(opener)?);
        *slot = Some(Arc::clone(&family));
        Ok(family)
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

static CACHE: SessionCache = SessionCache::new();

/// Process-wide entry point: bind (or reuse) the library family described
/// by `config`.
pub fn obtain(config: &DiscoveryConfig) -> Result<Arc<LibraryFamily>, DiscoveryError> {
    CACHE.obtain_with(&NativeOpener::from_config(config), config.force_reload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::test_support::FakeSource;
    use crate::tables::mandatory_symbols;
    use std::collections::HashMap;

    /// Scripted install: every module opens via its unversioned candidate
    /// name and reports whatever version is "installed", exactly like a
    /// real mismatched system would.
    struct FakeInstall {
        installed: HashMap<ModuleKind, Version>,
        // Symbols withheld from one module, to script bind failures.
        withhold: Option<(ModuleKind, &'static str)>,
    }

    impl FakeInstall {
        fn series_5x() -> Self {
            Self::with_versions(59, 59, 57, 4)
        }

        fn with_versions(format: u32, codec: u32, util: u32, resample: u32) -> Self {
            let mut installed = HashMap::new();
            installed.insert(ModuleKind::Format, Version::new(format, 37, 100));
            installed.insert(ModuleKind::Codec, Version::new(codec, 37, 100));
            installed.insert(ModuleKind::Util, Version::new(util, 28, 100));
            installed.insert(ModuleKind::Resample, Version::new(resample, 7, 100));
            Self {
                installed,
                withhold: None,
            }
        }

        fn withholding(mut self, kind: ModuleKind, symbol: &'static str) -> Self {
            self.withhold = Some((kind, symbol));
            self
        }
    }

    impl ModuleOpener for FakeInstall {
        fn open(
            &self,
            kind: ModuleKind,
            major: u32,
            log: &mut Vec<String>,
        ) -> Result<OpenedModule, LoadError> {
            let Some(version) = self.installed.get(&kind).copied() else {
                log.push(format!("open lib{kind}.so: not found"));
                return Err(LoadError::LibraryNotFound {
                    module: kind,
                    attempts: 1,
                });
            };
            let _ = major; // the unversioned candidate opens whatever is installed
            let mut source = FakeSource::with_symbols(
                mandatory_symbols(kind, version.major).into_iter(),
            );
            if let Some((victim_kind, symbol)) = self.withhold {
                if victim_kind == kind {
                    source = source.remove(symbol);
                }
            }
            let path = PathBuf::from(format!("/fake/lib{kind}.so"));
            log.push(format!("probed {kind} at {}: {version}", path.display()));
            Ok(OpenedModule {
                source: Box::new(source),
                path,
                version,
            })
        }
    }

    #[test]
    fn test_binding_5x_reports_exactly_those_versions() {
        let family = run_discovery(&FakeInstall::series_5x()).unwrap();
        assert_eq!(family.combo().format, 59);
        assert_eq!(family.combo().codec, 59);
        assert_eq!(family.combo().util, 57);
        assert_eq!(family.combo().resample, 4);
        assert_eq!(family.info(ModuleKind::Format).version.major, 59);
        assert_eq!(family.info(ModuleKind::Codec).version.major, 59);
        assert_eq!(family.info(ModuleKind::Util).version.major, 57);
        assert_eq!(family.info(ModuleKind::Resample).version.major, 4);
        assert!(family.codec_table().api.is_split());
    }

    #[test]
    fn test_discovery_walks_newest_first_and_logs_each_attempt() {
        // A 4.x install: the 7.x, 6.x, and 5.x combinations fail the
        // version-consistency check, the fourth combination binds.
        let family = run_discovery(&FakeInstall::with_versions(58, 58, 56, 3)).unwrap();
        assert_eq!(family.combo().codec, 58);

        let log = family.attempt_log();
        let unloads: Vec<&String> = log
            .iter()
            .filter(|l| l.starts_with("unload libraries"))
            .collect();
        assert_eq!(unloads.len(), 4);
        assert!(unloads[0].contains("avcodec=61"));
        assert!(unloads[3].contains("avcodec=58"));
        assert!(log.last().is_some_and(|l| l.starts_with("bound ")));
    }

    #[test]
    fn test_missing_symbol_rejects_the_module_wholesale() {
        let install =
            FakeInstall::series_5x().withholding(ModuleKind::Codec, "avcodec_receive_frame");
        let err = run_discovery(&install).unwrap_err();
        assert!(err
            .attempts
            .iter()
            .any(|l| l.contains("avcodec_receive_frame")));
    }

    #[test]
    fn test_no_install_yields_full_log() {
        let install = FakeInstall {
            installed: HashMap::new(),
            withhold: None,
        };
        let err = run_discovery(&install).unwrap_err();
        // One unload line plus one rejection per combination, plus the open
        // failures themselves.
        let unloads = err
            .attempts
            .iter()
            .filter(|l| l.starts_with("unload libraries"))
            .count();
        assert_eq!(unloads, VERSION_COMBOS.len());
        assert!(err.to_string().contains("attempts"));
    }

    #[test]
    fn test_cache_reuses_and_force_reload_rediscovers() {
        let cache = SessionCache::new();
        let install = FakeInstall::series_5x();
        let first = cache.obtain_with(&install, false).unwrap();
        let second = cache.obtain_with(&install, false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let third = cache.obtain_with(&install, true).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
