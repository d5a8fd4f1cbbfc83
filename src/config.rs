//! # Configuration Logic
//!
//! Run options for the imputation engine, parsed and validated with clap
//! derive. The crate ships no binary; a downstream CLI embeds [`Config`]
//! directly (`#[command(flatten)]`) or constructs it with
//! [`Config::default`] and adjusts fields.

use clap::{ArgAction, Parser};

use crate::error::{RemiError, Result};

/// Remi: haplotype-mosaic genotype imputation and phasing
#[derive(Parser, Debug, Clone)]
#[command(name = "remi")]
#[command(about = "Haplotype-mosaic genotype imputation and phasing", long_about = None)]
pub struct Config {
    // ============ Windowing Parameters ============
    /// Window size in typed markers
    #[arg(long, default_value_t = 2048)]
    pub width: usize,

    /// Minimum typed markers per window; thinner windows reuse a
    /// neighbouring window's candidate pairs
    #[arg(long = "min-typed-snps", default_value_t = 50)]
    pub min_typed_snps: usize,

    // ============ Search Parameters ============
    /// Use dynamic programming across windows (false: set-intersection mode)
    #[arg(long = "dynamic-programming", action = ArgAction::Set, default_value_t = true)]
    pub dynamic_programming: bool,

    /// Unique-haplotype count above which per-sample thinning kicks in
    #[arg(long = "max-haplotypes", default_value_t = 2000)]
    pub max_haplotypes: usize,

    /// Haplotypes retained per sample per window before the full pair search
    #[arg(long = "thinning-factor")]
    pub thinning_factor: Option<usize>,

    /// Weight thinning scores by inverse alt-allele frequency
    #[arg(long = "thinning-scale-allelefreq")]
    pub thinning_scale_allelefreq: bool,

    /// Re-rank the top candidate pairs on observed genotypes only
    #[arg(long)]
    pub rescreen: bool,

    // ============ Output Parameters ============
    /// Emit untyped markers in the output
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub impute: bool,

    /// Emit the mosaic genotype even where the input was observed
    #[arg(long = "full-mosaic")]
    pub full_mosaic: bool,

    // ============ General Parameters ============
    /// Number of threads (default: all available cores)
    #[arg(long)]
    pub nthreads: Option<usize>,
}

impl Config {
    /// Switch penalty weight for the cross-window dynamic program
    pub const LAMBDA: f32 = 1.0;

    /// Parse command line arguments and validate
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.width < 2 {
            return Err(RemiError::config(
                "The 'width' parameter must be at least 2 markers",
            ));
        }

        if self.max_haplotypes < 1 {
            return Err(RemiError::config(
                "The 'max_haplotypes' parameter must be positive",
            ));
        }

        // A thinned search still enumerates pairs, so a single survivor
        // would degenerate to (j, j) only.
        if let Some(keep) = self.thinning_factor {
            if keep < 2 {
                return Err(RemiError::config(
                    "The 'thinning_factor' parameter must be at least 2",
                ));
            }
        }

        if self.min_typed_snps < 1 {
            return Err(RemiError::config(
                "The 'min_typed_snps' parameter must be positive",
            ));
        }

        Ok(())
    }

    /// Get the number of threads to use
    pub fn nthreads(&self) -> usize {
        self.nthreads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Haplotypes retained per sample when thinning is active
    pub fn thinning_keep(&self) -> usize {
        self.thinning_factor.unwrap_or(self.max_haplotypes)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_from::<_, &str>([])
    }
}
