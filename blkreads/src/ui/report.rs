use std::{collections::HashMap, fmt};

pub fn print_interval(totals: &HashMap<String, u64>) {
    let s = render_interval_to_string(totals);
    // The renderer already ends with the blank line closing the interval.
    print!("{s}");
}

pub fn render_interval_to_string(totals: &HashMap<String, u64>) -> String {
    let mut out = String::new();
    write_interval(&mut out, totals).unwrap();
    out
}

fn write_interval<W: fmt::Write>(out: &mut W, totals: &HashMap<String, u64>) -> fmt::Result {
    for (comm, bytes) in totals {
        writeln!(out, "{comm}:{bytes}")?;
    }
    writeln!(out)
}
