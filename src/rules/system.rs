//! System administration commands: disks, power, permissions and processes.

use super::paths::{Target, classify_target};
use super::{Invocation, has_short_flag, option_value, positionals};
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// Command names routed to this provider (`mkfs.*` is matched by prefix).
pub const COMMANDS: &[&str] = &[
    "dd", "mkfs", "mke2fs", "mkswap", "wipefs", "fdisk", "sfdisk", "gdisk", "sgdisk", "cfdisk",
    "parted", "shred", "shutdown", "reboot", "halt", "poweroff", "init", "telinit", "systemctl",
    "chmod", "chown", "chgrp", "kill", "killall", "pkill", "crontab", "mv", "truncate",
    "iptables", "ip6tables",
];

/// Device files that are safe to write to.
const HARMLESS_DEVICES: &[&str] = &[
    "/dev/null",
    "/dev/zero",
    "/dev/stdout",
    "/dev/stderr",
    "/dev/stdin",
];

pub fn analyze_system(invocation: &Invocation<'_>, config: &AnalyzerConfig) -> Verdict {
    let name = invocation.name();
    let args = invocation.args();

    match name {
        "dd" => analyze_dd(&args),
        "mke2fs" | "mkswap" | "wipefs" => format_device(name),
        _ if name == "mkfs" || name.starts_with("mkfs.") => format_device(name),
        "fdisk" | "sfdisk" | "gdisk" | "sgdisk" | "cfdisk" | "parted" => {
            analyze_partitioner(name, &args)
        }
        "shred" => analyze_shred(&args),
        "shutdown" if args.contains(&"-c") => Verdict::allow(),
        "shutdown" | "reboot" | "halt" | "poweroff" => Verdict::deny(
            "system.power",
            format!("{name} stops or restarts the machine"),
        ),
        "init" | "telinit" if matches!(args.first(), Some(&"0" | &"6")) => Verdict::deny(
            "system.power",
            format!("{name} {} stops or restarts the machine", args[0]),
        ),
        "systemctl" => analyze_systemctl(&args),
        "chmod" | "chown" | "chgrp" => analyze_permissions(name, &args, config),
        "kill" => analyze_kill(&args),
        "killall" | "pkill" => Verdict::warn(
            format!("system.{name}"),
            format!("{name} terminates every matching process"),
        ),
        "crontab" if has_short_flag(&args, 'r') => Verdict::deny(
            "system.crontab_remove",
            "crontab -r deletes the entire crontab without confirmation",
        ),
        "mv" => analyze_mv(&args),
        "truncate" if option_value(&args, &["-s", "--size"]) == Some("0") => Verdict::warn(
            "system.truncate",
            "truncate -s 0 empties the file",
        ),
        "iptables" | "ip6tables"
            if args.contains(&"--flush") || has_short_flag(&args, 'F') =>
        {
            Verdict::warn(
                "system.firewall_flush",
                format!("{name} -F removes every firewall rule in the chain"),
            )
        }
        _ => Verdict::allow(),
    }
}

fn format_device(name: &str) -> Verdict {
    Verdict::deny(
        "system.mkfs",
        format!("{name} destroys all data on the target device"),
    )
}

fn analyze_dd(args: &[&str]) -> Verdict {
    let Some(output) = args.iter().find_map(|a| a.strip_prefix("of=")) else {
        return Verdict::allow();
    };

    if output.starts_with("/dev/") && !HARMLESS_DEVICES.contains(&output) {
        return Verdict::deny(
            "system.dd_device",
            format!("dd writing to {output} overwrites the raw device"),
        )
        .with_fragment(format!("of={output}"));
    }

    Verdict::allow()
}

fn analyze_partitioner(name: &str, args: &[&str]) -> Verdict {
    let list_mode = match name {
        "sgdisk" => args.iter().any(|a| matches!(*a, "-p" | "--print")),
        "parted" => {
            let words = positionals(args, &[]);
            args.iter().any(|a| matches!(*a, "-l" | "--list"))
                || (words.len() > 1 && words[1..].iter().all(|w| *w == "print"))
        }
        "cfdisk" => false,
        _ => args.iter().any(|a| matches!(*a, "-l" | "--list")),
    };

    if list_mode {
        return Verdict::allow();
    }

    Verdict::deny(
        "system.partition",
        format!("{name} can rewrite the partition table"),
    )
}

fn analyze_shred(args: &[&str]) -> Verdict {
    let targets = positionals(args, &["-n", "-s", "--iterations", "--size", "--random-source"]);

    if let Some(device) = targets.iter().find(|t| t.starts_with("/dev/")) {
        return Verdict::deny(
            "system.shred_device",
            format!("shred on {device} destroys the device contents"),
        )
        .with_fragment(*device);
    }

    if targets.is_empty() {
        return Verdict::allow();
    }

    Verdict::warn(
        "system.shred",
        "shred overwrites files so they can't be recovered",
    )
}

fn analyze_systemctl(args: &[&str]) -> Verdict {
    let words = positionals(
        args,
        &["-H", "--host", "-M", "--machine", "-t", "--type", "-p", "--property", "-s", "--signal"],
    );
    let Some(action) = words.first().copied() else {
        return Verdict::allow();
    };

    match action {
        "poweroff" | "reboot" | "halt" | "kexec" => Verdict::deny(
            "system.power",
            format!("systemctl {action} stops or restarts the machine"),
        ),
        "stop" | "disable" | "mask" => {
            let units = words[1..].join(" ");
            Verdict::warn(
                format!("system.systemctl_{action}"),
                format!("systemctl {action} takes down {units}").trim_end().to_string(),
            )
        }
        _ => Verdict::allow(),
    }
}

fn analyze_permissions(name: &str, args: &[&str], config: &AnalyzerConfig) -> Verdict {
    let recursive = args.contains(&"--recursive") || has_short_flag(args, 'R');
    if !recursive {
        return Verdict::allow();
    }

    let words = positionals(args, &[]);
    let Some((mode, targets)) = words.split_first() else {
        return Verdict::allow();
    };

    if let Some(target) = targets
        .iter()
        .find(|t| classify_target(t, config) == Target::Catastrophic)
    {
        return Verdict::deny(
            format!("system.{name}_recursive"),
            format!("{name} -R on '{target}' changes ownership or modes of the whole system"),
        )
        .with_fragment(*target);
    }

    if name == "chmod" && matches!(*mode, "777" | "0777" | "a+rwx" | "ugo+rwx") {
        return Verdict::warn(
            "system.chmod_world_writable",
            format!("chmod -R {mode} makes every file world-writable"),
        );
    }

    Verdict::allow()
}

fn analyze_kill(args: &[&str]) -> Verdict {
    let mut pids = Vec::new();
    let mut signal_seen = false;
    let mut options_done = false;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if options_done || !arg.starts_with('-') || signal_seen {
            pids.push(*arg);
        } else if *arg == "--" {
            options_done = true;
        } else if matches!(*arg, "-l" | "-L" | "--list" | "--table") {
            return Verdict::allow();
        } else if matches!(*arg, "-s" | "-n" | "--signal") {
            iter.next();
            signal_seen = true;
        } else {
            // First dash option is the signal (-9, -KILL)
            signal_seen = true;
        }
    }

    if let Some(pid) = pids.iter().find(|p| matches!(**p, "1" | "-1")) {
        return Verdict::deny(
            "system.kill_all",
            format!("kill {pid} signals init or every process"),
        )
        .with_fragment(*pid);
    }

    Verdict::allow()
}

fn analyze_mv(args: &[&str]) -> Verdict {
    let into_null = option_value(args, &["-t", "--target-directory"]) == Some("/dev/null")
        || positionals(args, &["-t", "--target-directory", "-S", "--suffix"]).last()
            == Some(&"/dev/null");

    if into_null {
        return Verdict::deny(
            "system.mv_dev_null",
            "mv into /dev/null destroys the moved files",
        );
    }

    Verdict::allow()
}
