use crate::device::{DiscoveryResult, TapeDeviceNode};
use crate::error::Result;
use crate::runner::Attempts;
use crate::tape_ops::status::PERMISSION_REMEDY;
use crate::tape_ops::{LtfsMount, MamAttribute, MountRecord, SuiteReport};
use std::path::Path;

/// Device listing, one path per line in selection order
pub fn display_device_list(discovery: &DiscoveryResult, detailed: bool) {
    if discovery.is_empty() {
        println!("❌ No tape devices detected");
        display_permission_warning(discovery);
        return;
    }

    println!(
        "📼 Found {} tape device(s) on {} drive(s)",
        discovery.ordered_devices.len(),
        discovery.physical_drives.len()
    );

    if detailed {
        for drive in discovery.physical_drives.values() {
            println!("\nDrive {}:", drive.drive_number);
            println!("  Rewinding:");
            for node in &drive.rewinding_modes {
                println!("    {}", node_line(node));
            }
            println!("  Non-rewinding:");
            for node in &drive.non_rewinding_modes {
                println!("    {}", node_line(node));
            }
        }
    } else {
        for path in &discovery.ordered_devices {
            println!("  {}", path.display());
        }
    }

    display_permission_warning(discovery);
}

fn node_line(node: &TapeDeviceNode) -> String {
    let mut line = format!("{:<16} {}", node.path.display(), node.mode.description());
    if !node.accessible {
        line.push_str(" (permission denied)");
    }
    line
}

pub fn display_discovery_json(discovery: &DiscoveryResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(discovery)?);
    Ok(())
}

pub fn display_permission_warning(discovery: &DiscoveryResult) {
    if discovery.permission_issues.is_empty() {
        return;
    }
    println!("\n⚠️  Permission denied on:");
    for path in &discovery.permission_issues {
        println!("  {}", path.display());
    }
    println!("💡 Add your user to the tape group: {}", PERMISSION_REMEDY);
    println!("   then log out and back in for the change to take effect");
}

/// Every attempted command line, then the final outcome
pub fn display_attempts(action: &str, attempts: &Attempts) {
    for command in &attempts.attempted {
        println!("  Trying: {}", command);
    }
    if attempts.succeeded() {
        println!("✅ {} succeeded", action);
    } else {
        println!("❌ {} failed: {}", action, attempts.output.error_message());
    }
}

pub fn display_mount_record(mount_point: &Path, record: &MountRecord) {
    println!("  Device: {}", record.device.display());
    println!("  Mount point: {}", mount_point.display());
    if !record.options.is_empty() {
        println!("  Options: {}", record.options.join(","));
    }
    println!(
        "  Mounted at: {}",
        record.mounted_at.format("%Y-%m-%d %H:%M:%S")
    );
}

pub fn display_mounts(mounts: &[LtfsMount]) {
    if mounts.is_empty() {
        println!("No LTFS filesystems mounted");
        return;
    }
    println!("{:<24} {:<32} {:<8}", "Source", "Mount point", "Type");
    println!("{:-<66}", "");
    for mount in mounts {
        println!(
            "{:<24} {:<32} {:<8}",
            mount.source,
            mount.mount_point.display().to_string(),
            mount.fstype
        );
    }
}

pub fn display_suite_reports(reports: &[SuiteReport]) {
    for report in reports {
        println!("{}", report.render());
    }
    let failures: usize = reports.iter().map(|r| r.failures()).sum();
    if failures == 0 {
        println!("✅ All diagnostic steps passed");
    } else {
        println!("⚠️  {} diagnostic step(s) failed", failures);
    }
}

pub fn display_mam_attributes(attributes: &[MamAttribute]) {
    if attributes.is_empty() {
        println!("No attributes returned");
        return;
    }
    println!(
        "{:<8} {:<40} {:<7} {:<3} {}",
        "ID", "Name", "Format", "RO", "Value"
    );
    println!("{:-<80}", "");
    for attribute in attributes {
        println!(
            "0x{:04X}   {:<40} {:<7} {:<3} {}",
            attribute.id,
            attribute.name(),
            attribute.format.as_str(),
            if attribute.read_only { "yes" } else { "no" },
            attribute.display_value()
        );
    }
}
