use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// Integration test targets under `crates/eqadc/tests/`.
const INTEGRATION_TESTS: &[&str] = &["init_sequence", "queue_proptest", "newtypes"];

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running eQADC tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    let run_unit = !integration_only;
    let run_integration = !unit_only;

    if run_unit {
        println!("{}", "  Running unit tests...".cyan());
        let start = Instant::now();
        let output = cargo(&["test", "-p", "eqadc", "--lib"]).context("Failed to run unit tests")?;
        report("Unit tests", &output, start)?;
    }

    if run_integration {
        for &name in INTEGRATION_TESTS {
            println!("{}", format!("  Running {name}...").cyan());
            let start = Instant::now();
            let output = cargo(&["test", "-p", "eqadc", "--test", name])
                .with_context(|| format!("Failed to run {name}"))?;
            report(name, &output, start)?;
        }
    }

    println!("{}", "  Running doc tests...".cyan());
    let doc_start = Instant::now();
    let doc_output = cargo(&["test", "-p", "eqadc", "--doc"]).context("Failed to run doc tests")?;
    if !doc_output.status.success() {
        eprintln!("{}", "  ⚠ Doc tests failed".yellow().bold());
        // Don't fail on doc test failures
    } else {
        let summary = extract_test_summary(&String::from_utf8_lossy(&doc_output.stdout));
        println!(
            "{}",
            format!(
                "  ✓ Doc tests passed {} in {:.2}s",
                summary,
                doc_start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn cargo(args: &[&str]) -> std::io::Result<Output> {
    Command::new("cargo").args(args).output()
}

fn report(label: &str, output: &Output, start: Instant) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {}", line);
        }
        anyhow::bail!("{label} failed");
    }

    println!(
        "{}",
        format!(
            "  ✓ {} passed {} in {:.2}s",
            label,
            extract_test_summary(&stdout),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

fn extract_test_summary(output: &str) -> String {
    // Look for lines like "test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out"
    for line in output.lines() {
        if line.contains("test result:") {
            if let Some(summary) = line.split("test result:").nth(1) {
                return summary.trim().to_string();
            }
        }
    }
    "(summary not available)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_extracted_from_cargo_output() {
        let out = "running 3 tests\ntest result: ok. 3 passed; 0 failed; 0 ignored\n";
        assert_eq!(
            extract_test_summary(out),
            "ok. 3 passed; 0 failed; 0 ignored"
        );
    }

    #[test]
    fn missing_summary_is_reported() {
        assert_eq!(extract_test_summary(""), "(summary not available)");
    }
}
