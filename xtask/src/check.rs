use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Bare-metal target used to prove the driver core stays `no_std`.
pub(crate) const NO_STD_TARGET: &str = "thumbv7em-none-eabihf";

/// One `cargo check` invocation of the driver crate.
struct CheckStep {
    label: &'static str,
    args: &'static [&'static str],
}

const STEPS: &[CheckStep] = &[
    CheckStep {
        label: "host, default features",
        args: &["check", "-p", "eqadc", "--all-targets"],
    },
    CheckStep {
        label: "host, std + tracing",
        args: &["check", "-p", "eqadc", "--features", "std,tracing"],
    },
    CheckStep {
        label: "ADC0 only",
        args: &["check", "-p", "eqadc", "--no-default-features", "--features", "adc0"],
    },
    CheckStep {
        label: "ADC1 only",
        args: &["check", "-p", "eqadc", "--no-default-features", "--features", "adc1"],
    },
    CheckStep {
        label: "bare metal (no_std) + defmt",
        args: &[
            "check",
            "-p",
            "eqadc",
            "--target",
            NO_STD_TARGET,
            "--features",
            "defmt",
        ],
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking eQADC driver builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(step.args)
            .output()
            .with_context(|| format!("Failed to check {}", step.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} check failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} check failed", step.label);
        }

        println!(
            "{}",
            format!(
                "  ✓ {} passed in {:.2}s",
                step.label,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
    }

    // Clippy lints
    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();

    let clippy_output = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .output()
        .context("Failed to run clippy")?;

    if !clippy_output.status.success() {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
        // Don't fail on clippy warnings, just show them
    } else {
        println!(
            "{}",
            format!(
                "  ✓ Clippy passed in {:.2}s",
                clippy_start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    // Format check
    println!("{}", "  Checking code formatting...".cyan());

    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if !fmt_output.status.success() {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    } else {
        println!("{}", "  ✓ Formatting check passed".green());
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
