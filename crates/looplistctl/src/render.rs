//! Output rendering for looplistctl.

use looplist_core::{CheckIn, Loop, LoopStatus, Notification, NotificationLevel};
use looplist_store::{Notifier, TracingNotifier};

/// Prints successes to stdout; failures go to the tracing log on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier {
    log: TracingNotifier,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Success => println!("{}", notification.message),
            NotificationLevel::Error => self.log.notify(notification),
        }
    }
}

/// Print the key facts of a single loop.
pub fn print_loop_summary(l: &Loop) {
    println!("{} {}", display_emoji(l), l.title);
    println!("  ID:         {}", l.id);
    println!("  Owner:      {}", l.user_id);
    println!("  Frequency:  {}", l.frequency.as_str());
    println!("  Visibility: {}", l.visibility.as_str());
    println!("  Status:     {}", format_status(l.status));
    println!(
        "  Streak:     {} (longest {})",
        l.current_streak, l.longest_streak
    );
}

/// Print a list of loops in tabular format.
pub fn print_loop_list(loops: &[Loop]) {
    if loops.is_empty() {
        println!("No loops found.");
        return;
    }

    println!(
        "{:<36}  {:<24}  {:<9}  {:>6}  {:>5}  {:>6}  {:>6}",
        "ID", "TITLE", "STATUS", "STREAK", "RATE", "CHEERS", "CLONES"
    );
    println!("{}", "-".repeat(104));

    for l in loops {
        println!(
            "{:<36}  {:<24}  {:<9}  {:>6}  {:>5}  {:>6}  {:>6}",
            l.id.0,
            truncate(&l.title, 24),
            format_status(l.status),
            l.current_streak,
            format_rate(l.completion_rate),
            l.cheers,
            l.clones,
        );
    }

    println!();
    println!("{} loop(s)", loops.len());
}

/// Print a loop with its check-in history, newest first.
pub fn print_loop_details(l: &Loop, check_ins: &[CheckIn], cheered: bool) {
    println!("Loop: {}", l.id);
    println!();
    println!("  Title:           {} {}", display_emoji(l), l.title);
    println!("  Owner:           {}", l.user_id);
    println!("  Frequency:       {}", l.frequency.as_str());
    if let Some(ref days) = l.custom_days {
        let days: Vec<String> = days.iter().map(u8::to_string).collect();
        println!("  Days:            {}", days.join(","));
    }
    if let Some(ref category) = l.category {
        println!("  Category:        {category}");
    }
    println!("  Visibility:      {}", l.visibility.as_str());
    println!("  Status:          {}", format_status(l.status));
    println!("  Current Streak:  {}", l.current_streak);
    println!("  Longest Streak:  {}", l.longest_streak);
    println!("  Completion Rate: {}", format_rate(l.completion_rate));
    println!(
        "  Cheers:          {}{}",
        l.cheers,
        if cheered { " (including yours)" } else { "" }
    );
    println!("  Clones:          {}", l.clones);
    println!("  Started:         {}", format_time(&l.start_date));
    println!("  Created:         {}", format_time(&l.created_at));

    if check_ins.is_empty() {
        return;
    }

    let mut ordered: Vec<&CheckIn> = check_ins.iter().collect();
    ordered.sort_by(|a, b| b.date.cmp(&a.date));

    println!();
    println!("  Check-ins:");
    println!("    {:<10}  {:<16}  {:<6}", "DATE", "USER", "DONE");
    println!("    {}", "-".repeat(36));
    for ci in ordered {
        println!(
            "    {:<10}  {:<16}  {:<6}",
            ci.date,
            truncate(&ci.user_id.0, 16),
            if ci.completed { "yes" } else { "no" },
        );
    }
}

/// Print the streak line after a check-in.
pub fn print_streak(l: &Loop) {
    println!(
        "  Streak: {} (longest {}), {} complete, {}",
        l.current_streak,
        l.longest_streak,
        format_rate(l.completion_rate),
        format_status(l.status)
    );
}

fn display_emoji(l: &Loop) -> &str {
    l.emoji.as_deref().unwrap_or("•")
}

fn format_status(status: LoopStatus) -> &'static str {
    match status {
        LoopStatus::Active => "ACTIVE",
        LoopStatus::Broken => "BROKEN",
        LoopStatus::Completed => "COMPLETED",
    }
}

fn format_rate(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

fn format_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
