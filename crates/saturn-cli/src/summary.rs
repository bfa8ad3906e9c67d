use std::path::Path;

use console::Style;
use saturn_core::pipeline::{RunConfig, RunSummary, StageCounts};
use saturn_core::registry::Registry;
use saturn_core::stage::{FrameSignature, PipelineStage};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    bad: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            bad: Style::new().red().bold(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title.apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

fn print_path(s: &Styles, label: &str, path: Option<&Path>) {
    match path {
        Some(p) => println!("  {:<14}{}", s.label.apply_to(label), s.path.apply_to(p.display())),
        None => println!("  {:<14}{}", s.label.apply_to(label), s.disabled.apply_to("not set")),
    }
}

pub fn print_run_config(config: &RunConfig) {
    let s = Styles::new();
    print_title(&s, "Saturn Pipeline");

    print_path(&s, "Input", Some(&config.input_root));
    print_path(&s, "Output", config.output_root.as_deref());
    print_path(&s, "Masters", config.master_library.as_deref());
    print_path(&s, "References", config.reference_library.as_deref());
    println!(
        "  {:<14}{}",
        s.label.apply_to("Layout"),
        s.value.apply_to(config.path_mode)
    );
    println!();

    println!("  {}", s.header.apply_to("Stages"));
    let toggles = [
        ("Calibrate", config.stages.calibrate),
        ("Cosmetic", config.stages.cosmetic),
        ("Debayer", config.stages.debayer),
        ("Register", config.stages.register),
        ("Normalize", config.stages.normalize),
        ("Approve", config.stages.approve),
    ];
    for (name, enabled) in toggles {
        let state = if enabled {
            s.good.apply_to("on")
        } else {
            s.disabled.apply_to("off")
        };
        println!("    {:<12}{}", s.label.apply_to(name), state);
    }
    println!();

    let flag = |on: bool| if on { "yes" } else { "no" };
    println!(
        "  {:<14}{}",
        s.label.apply_to("Skip existing"),
        s.value.apply_to(flag(config.skip_existing))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Overwrite"),
        s.value.apply_to(flag(config.overwrite))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Backfill"),
        s.value.apply_to(flag(config.backfill))
    );
    println!();
}

fn print_counts(s: &Styles, name: &str, c: StageCounts) {
    let failed = if c.failed > 0 {
        s.bad.apply_to(format!("{} failed", c.failed))
    } else {
        s.label.apply_to("0 failed".to_string())
    };
    println!(
        "    {:<12}{}  {}  {}",
        s.label.apply_to(name),
        s.good.apply_to(format!("{:>5} done", c.processed)),
        s.value.apply_to(format!("{:>5} skipped", c.skipped)),
        failed
    );
}

fn print_incomplete(s: &Styles, incomplete: &[(FrameSignature, PipelineStage)]) {
    println!("  {}", s.header.apply_to("Incomplete"));
    for (signature, stage) in incomplete {
        println!(
            "    {}  {}",
            s.value.apply_to(signature),
            s.disabled.apply_to(format!("missing {stage}"))
        );
    }
    println!();
}

pub fn print_run_summary(summary: &RunSummary) {
    let s = Styles::new();
    print_title(&s, "Summary");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Files"),
        s.value.apply_to(summary.discovered)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Raw frames"),
        s.value.apply_to(summary.raw_frames)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Complete"),
        s.value.apply_to(summary.already_complete)
    );
    if summary.metadata_missing > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("No metadata"),
            s.bad.apply_to(summary.metadata_missing)
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Stages"));
    for (stage, counts) in &summary.stages {
        print_counts(&s, &stage.to_string(), *counts);
    }
    if summary.debayer != StageCounts::default() {
        print_counts(&s, "Debayer", summary.debayer);
    }
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Backfilled"),
        s.value.apply_to(summary.backfilled)
    );
    if summary.backfill_failed > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Fill failed"),
            s.bad.apply_to(summary.backfill_failed)
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.1}s", summary.elapsed.as_secs_f64()))
    );
    println!();

    if !summary.incomplete.is_empty() {
        print_incomplete(&s, &summary.incomplete);
    }
}

pub fn print_scan_report(
    root: &Path,
    files: usize,
    registry: &Registry,
    gaps: &[(FrameSignature, PipelineStage)],
    list_gaps: bool,
) {
    let s = Styles::new();
    print_title(&s, "Saturn Scan");

    print_path(&s, "Root", Some(root));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Files"),
        s.value.apply_to(files)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(registry.len())
    );
    println!();

    println!("  {}", s.header.apply_to("Stages"));
    for stage in PipelineStage::ALL {
        println!(
            "    {:<12}{}",
            s.label.apply_to(stage),
            s.value.apply_to(registry.count_at(stage))
        );
    }
    println!();

    let gap_count = if gaps.is_empty() {
        s.good.apply_to("none".to_string())
    } else {
        s.bad.apply_to(gaps.len().to_string())
    };
    println!("  {:<14}{}", s.label.apply_to("Gaps"), gap_count);
    println!();

    if list_gaps && !gaps.is_empty() {
        print_incomplete(&s, gaps);
    }
}
