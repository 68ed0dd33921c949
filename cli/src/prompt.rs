use anyhow::{anyhow, Error};
use rusty_balances::types::{Network, Selection};
use std::io::{self, BufRead, Write};

const ALL: &str = "All";

/// Asks on stdin which network to query. `0` or `All` selects every network,
/// a number or a name selects one.
pub fn select_network(networks: &[Network]) -> Result<Selection, Error> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    writeln!(stdout, "Select network:")?;
    writeln!(stdout, "  0) {ALL}")?;
    for (idx, network) in networks.iter().enumerate() {
        writeln!(stdout, "  {}) {}", idx + 1, network.name)?;
    }

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(anyhow!("no selection made"));
        }

        match parse_choice(line.trim(), networks) {
            Some(selection) => return Ok(selection),
            None => writeln!(stdout, "Unknown option `{}`", line.trim())?,
        }
    }
}

fn parse_choice(input: &str, networks: &[Network]) -> Option<Selection> {
    if input.eq_ignore_ascii_case(ALL) {
        return Some(Selection::All);
    }

    if let Ok(idx) = input.parse::<usize>() {
        return match idx {
            0 => Some(Selection::All),
            _ => networks
                .get(idx - 1)
                .map(|n| Selection::Network(n.name.clone())),
        };
    }

    networks
        .iter()
        .find(|n| n.name.eq_ignore_ascii_case(input))
        .map(|n| Selection::Network(n.name.clone()))
}

#[cfg(test)]
mod test {
    use super::parse_choice;
    use rusty_balances::types::{Network, Selection};

    fn networks() -> Vec<Network> {
        ["Ethereum", "BSC"]
            .iter()
            .map(|name| Network {
                name: name.to_string(),
                rpc: format!("https://{name}.invalid"),
                multicall: None,
                tokens: vec![],
            })
            .collect()
    }

    #[test]
    fn choices_by_number_and_name() {
        let networks = networks();

        assert_eq!(parse_choice("0", &networks), Some(Selection::All));
        assert_eq!(parse_choice("all", &networks), Some(Selection::All));
        assert_eq!(
            parse_choice("2", &networks),
            Some(Selection::Network("BSC".into()))
        );
        assert_eq!(
            parse_choice("ethereum", &networks),
            Some(Selection::Network("Ethereum".into()))
        );
        assert_eq!(parse_choice("3", &networks), None);
        assert_eq!(parse_choice("Solana", &networks), None);
        assert_eq!(parse_choice("", &networks), None);
    }
}
