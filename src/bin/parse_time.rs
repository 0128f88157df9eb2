use anyhow::Result;
use std::env;

#[path = "../processor/time_parser.rs"]
mod time_parser;

use time_parser::{GrammarMatch, TimeParser};

fn main() -> Result<()> {
    let inputs: Vec<String> = env::args().skip(1).collect();
    if inputs.is_empty() {
        println!("Usage: parse_time <time text>...");
        println!("Example: parse_time \"2025年11月15日(10:25-12:15)\" \"(2025-11-18) 13:30-15:20\"");
        return Ok(());
    }

    let parser = TimeParser::new()?;

    for raw in &inputs {
        println!("=== {} ===", raw);

        match parser.match_grammar(raw.trim()) {
            Some(GrammarMatch::Localized { .. }) => println!("Grammar: localized"),
            Some(GrammarMatch::Iso { .. }) => println!("Grammar: iso"),
            None => println!("Grammar: none"),
        }

        match parser.parse(raw) {
            Ok(slot) => {
                println!("  date:     {}", slot.date_string());
                println!("  start:    {}", slot.start_timestamp());
                println!("  end:      {}", slot.end_timestamp());
                println!("  duration: {} min", slot.duration_minutes);
            }
            Err(e) => println!("  error:    {}", e),
        }
        println!();
    }

    Ok(())
}
