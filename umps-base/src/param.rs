//! Compiled-in configuration defaults, in the style of `g1_param::define!`.
//!
//! Every tunable that spec.md leaves as "a configurable default" (high-water marks, timeouts,
//! ping-interval schedules, pool sizes) is declared with [`define_param!`] instead of a bare
//! `const`, so that (a) the default lives next to the code that uses it and (b) every parameter
//! in the binary can be enumerated for diagnostics via [`PARAMETERS`].

#[linkme::distributed_slice]
pub static PARAMETERS: [fn() -> ParamInfo] = [..];

#[derive(Clone, Debug)]
pub struct ParamInfo {
    pub module_path: &'static str,
    pub name: &'static str,
    pub value: String,
}

/// Declares a lazily-initialized, process-wide parameter.
///
/// ```ignore
/// define_param!(pub max_key_size: usize = 256);
/// ```
#[macro_export]
macro_rules! define_param {
    ($(#[$meta:meta])* $v:vis $name:ident : $type:ty = $default:expr) => {
        $(#[$meta])*
        $v fn $name() -> &'static $type {
            #[::linkme::distributed_slice($crate::param::PARAMETERS)]
            static INFO: fn() -> $crate::param::ParamInfo = || $crate::param::ParamInfo {
                module_path: ::std::module_path!(),
                name: ::std::stringify!($name),
                value: ::std::format!("{:?}", $name()),
            };

            static VALUE: ::std::sync::OnceLock<$type> = ::std::sync::OnceLock::new();
            VALUE.get_or_init(|| $default)
        }
    };
}

/// Returns the value of every registered parameter, for diagnostics (e.g. a `--dump-params`
/// flag on a service binary).
pub fn dump() -> Vec<ParamInfo> {
    PARAMETERS.iter().map(|info| info()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    define_param!(pub(crate) test_default: u32 = 7);

    #[test]
    fn default_value() {
        assert_eq!(*test_default(), 7);
    }

    #[test]
    fn dump_contains_registered_params() {
        let _ = test_default();
        assert!(dump().iter().any(|info| info.name == "test_default"));
    }
}
