//! Decay-delay sweep driver: one fresh colony and one image per `tau`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notch_core::{Colony, ColonyConfig, DecayDelay};
use notch_render::save_png;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Zero-padded width of the numeric part of figure names.
pub const FIGURE_STEM_WIDTH: usize = 4;

/// Delays swept when none are given: `0..=19` followed by an unbounded delay.
#[must_use]
pub fn default_taus() -> Vec<DecayDelay> {
    (0..20)
        .map(|tau| DecayDelay::Finite(f64::from(tau)))
        .chain(std::iter::once(DecayDelay::Unbounded))
        .collect()
}

/// Label used in figure names: integer part of `tau`, zero padded; all nines when unbounded.
#[must_use]
pub fn figure_stem(tau: DecayDelay) -> String {
    match tau {
        DecayDelay::Finite(ticks) if ticks.is_finite() => {
            format!("{:0width$}", ticks.trunc() as u64, width = FIGURE_STEM_WIDTH)
        }
        DecayDelay::Finite(_) | DecayDelay::Unbounded => "9".repeat(FIGURE_STEM_WIDTH),
    }
}

/// Path of the image saved for `tau` inside `output_dir`.
#[must_use]
pub fn figure_path(output_dir: &Path, tau: DecayDelay) -> PathBuf {
    output_dir.join(format!("colony_{}.png", figure_stem(tau)))
}

/// Parameters shared by every run of a sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    pub rows: usize,
    pub columns: usize,
    /// Ticks applied to each colony before it is rendered.
    pub generations: usize,
    pub notch_threshold: f64,
    pub taus: Vec<DecayDelay>,
    pub output_dir: PathBuf,
    /// Pixels per cell edge in the saved images; 1 draws one pixel per cell.
    pub scale: u32,
    /// Seed reused for every run so that only `tau` varies between images.
    pub rng_seed: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            columns: 100,
            generations: 1_000,
            notch_threshold: 0.5,
            taus: default_taus(),
            output_dir: PathBuf::from("figs"),
            scale: 1,
            rng_seed: None,
        }
    }
}

impl SweepConfig {
    fn colony_config(&self, tau: DecayDelay) -> ColonyConfig {
        ColonyConfig {
            rng_seed: self.rng_seed,
            ..ColonyConfig::new(self.rows, self.columns, tau, self.notch_threshold)
        }
    }
}

/// Outcome of a single colony run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepEntry {
    pub tau: DecayDelay,
    pub image: PathBuf,
    pub active: usize,
    pub committed: usize,
    pub deactivated: usize,
}

/// Outcome of a full sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepReport {
    pub rows: usize,
    pub columns: usize,
    pub generations: usize,
    pub notch_threshold: f64,
    pub entries: Vec<SweepEntry>,
}

impl SweepReport {
    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Runs one colony per configured `tau` and saves a snapshot image for each.
pub fn run_sweep(config: &SweepConfig) -> Result<SweepReport> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let mut entries = Vec::with_capacity(config.taus.len());
    for &tau in &config.taus {
        entries.push(run_single(config, tau)?);
    }

    Ok(SweepReport {
        rows: config.rows,
        columns: config.columns,
        generations: config.generations,
        notch_threshold: config.notch_threshold,
        entries,
    })
}

fn run_single(config: &SweepConfig, tau: DecayDelay) -> Result<SweepEntry> {
    let mut colony = Colony::new(config.colony_config(tau))
        .with_context(|| format!("failed to build colony for tau={tau}"))?;
    colony.run(config.generations);

    let image = figure_path(&config.output_dir, tau);
    save_png(&colony.as_color_array(), config.scale, &image)?;

    let census = colony.census();
    info!(
        %tau,
        active = census.active,
        committed = census.committed,
        deactivated = census.deactivated,
        path = %image.display(),
        "saved colony snapshot",
    );

    Ok(SweepEntry {
        tau,
        image,
        active: census.active,
        committed: census.committed,
        deactivated: census.deactivated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn figure_stems_are_zero_padded() {
        assert_eq!(figure_stem(DecayDelay::Finite(0.0)), "0000");
        assert_eq!(figure_stem(DecayDelay::Finite(7.0)), "0007");
        assert_eq!(figure_stem(DecayDelay::Finite(12.9)), "0012");
        assert_eq!(figure_stem(DecayDelay::Finite(12_345.0)), "12345");
        assert_eq!(figure_stem(DecayDelay::Unbounded), "9999");
        assert_eq!(figure_stem(DecayDelay::Finite(f64::INFINITY)), "9999");
        assert_eq!(
            figure_path(Path::new("figs"), DecayDelay::Finite(3.0)),
            PathBuf::from("figs/colony_0003.png")
        );
    }

    #[test]
    fn default_sweep_covers_twenty_delays_and_unbounded() {
        let taus = default_taus();
        assert_eq!(taus.len(), 21);
        assert_eq!(taus[0], DecayDelay::Finite(0.0));
        assert_eq!(taus[19], DecayDelay::Finite(19.0));
        assert_eq!(taus[20], DecayDelay::Unbounded);
        assert_eq!(SweepConfig::default().taus, taus);
    }

    #[test]
    fn sweep_writes_one_image_per_tau() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = SweepConfig {
            rows: 10,
            columns: 12,
            generations: 25,
            taus: vec![DecayDelay::Finite(0.0), DecayDelay::Unbounded],
            output_dir: dir.path().join("nested").join("figs"),
            scale: 1,
            rng_seed: Some(11),
            ..SweepConfig::default()
        };

        let report = run_sweep(&config)?;
        assert_eq!(report.entries.len(), 2);
        for entry in &report.entries {
            assert!(entry.image.exists(), "{} missing", entry.image.display());
            assert_eq!(entry.active + entry.committed + entry.deactivated, 120);
        }
        assert_eq!(report.entries[1].deactivated, 0);

        let report_path = dir.path().join("report.json");
        report.write_json(&report_path)?;
        let parsed: SweepReport = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
        assert_eq!(parsed, report);
        Ok(())
    }

    #[test]
    fn default_sweep_draws_one_pixel_per_cell() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = SweepConfig {
            rows: 7,
            columns: 9,
            generations: 5,
            taus: vec![DecayDelay::Finite(2.0)],
            output_dir: dir.path().to_path_buf(),
            ..SweepConfig::default()
        };
        assert_eq!(config.scale, 1);

        let report = run_sweep(&config)?;
        let dims = image::image_dimensions(&report.entries[0].image)?;
        assert_eq!(dims, (9, 7), "image should be columns x rows pixels");
        Ok(())
    }

    #[test]
    fn invalid_dimensions_fail_the_sweep() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = SweepConfig {
            rows: 0,
            taus: vec![DecayDelay::Finite(1.0)],
            output_dir: dir.path().to_path_buf(),
            ..SweepConfig::default()
        };
        let err = run_sweep(&config).expect_err("zero rows");
        assert!(format!("{err:#}").contains("grid dimensions must be non-zero"));
        Ok(())
    }
}
