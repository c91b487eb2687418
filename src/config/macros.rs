/// Configuration macros for zero-repetition config definitions
///
/// This module provides the `config_struct!` macro that allows defining
/// configuration structures with embedded defaults in a single declaration.

/// Define a configuration struct with embedded defaults
///
/// Generates the struct with public fields, a `Default` implementation built
/// from the per-field default expressions, and serde support with
/// `#[serde(default)]` so partial TOML files are accepted.
///
/// # Example
/// ```
/// use universe_prep::config_struct;
///
/// config_struct! {
///     pub struct ThresholdConfig {
///         min_liquidity_usd: f64 = 4_000_000.0,
///         max_pairs: usize = 100,
///         enabled: bool = true,
///     }
/// }
///
/// let cfg = ThresholdConfig::default();
/// assert_eq!(cfg.max_pairs, 100);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
