use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// One rustdoc build of the driver crate.
struct DocSet {
    label: &'static str,
    args: &'static [&'static str],
    /// Where the rendered crate root lands, relative to the workspace.
    index: &'static str,
}

/// Host docs include the simulated peripheral (`std`) and the `tracing`
/// call sites; the bare-metal set renders what firmware actually links.
const DOC_SETS: &[DocSet] = &[
    DocSet {
        label: "host (std + tracing, with mocks)",
        args: &["doc", "-p", "eqadc", "--no-deps", "--features", "std,tracing"],
        index: "target/doc/eqadc/index.html",
    },
    DocSet {
        label: "bare metal (no_std + defmt)",
        args: &[
            "doc",
            "-p",
            "eqadc",
            "--no-deps",
            "--target",
            crate::check::NO_STD_TARGET,
            "--features",
            "defmt",
        ],
        index: "target/thumbv7em-none-eabihf/doc/eqadc/index.html",
    },
];

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Rendering eQADC driver docs...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for (i, set) in DOC_SETS.iter().enumerate() {
        println!("{}", format!("  Documenting {}...", set.label).cyan());
        let start = Instant::now();

        let mut cmd = Command::new("cargo");
        cmd.args(set.args);
        // Only the first (host) set is opened in the browser.
        if open && i == 0 {
            cmd.arg("--open");
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to document {}", set.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} docs failed", set.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} docs failed", set.label);
        }

        println!(
            "{}",
            format!(
                "  ✓ {} in {:.2}s -> {}",
                set.label,
                start.elapsed().as_secs_f64(),
                set.index
            )
            .green()
        );
    }

    println!();
    println!(
        "{}",
        format!(
            "✓ {} doc sets built in {:.2}s",
            DOC_SETS.len(),
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    if !open {
        println!("   {}", "Pass --open to view the host docs".dimmed());
    }
    println!();

    Ok(())
}
