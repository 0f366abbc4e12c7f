pub mod drawdown;
pub mod moments;
pub mod var;

pub use drawdown::{drawdown, DrawdownResult, MaxDrawdown};
pub use moments::{
    higher_moment, is_normal, is_normal_table, jarque_bera, kurtosis, kurtosis_table, skewness,
    skewness_table, JarqueBera, DEFAULT_NORMALITY_LEVEL,
};
pub use var::{
    cornish_fisher_z, cvar_historic, cvar_historic_series, cvar_historic_value, var_gaussian,
    var_gaussian_series, var_historic, var_historic_series, var_historic_value, DEFAULT_VAR_LEVEL,
};
