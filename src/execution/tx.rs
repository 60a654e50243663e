//! Programmable transaction descriptions.
//!
//! The client only describes what to run: a list of commands whose arguments
//! are pure values, object ids or results of earlier commands. Signing,
//! gas selection and execution belong to the wallet.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::OnceLock;

/// `0x` followed by 1 to 64 hex digits.
pub fn is_sui_address(value: &str) -> bool {
    static ADDRESS: OnceLock<Option<Regex>> = OnceLock::new();
    ADDRESS
        .get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{1,64}$").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

/// u64 values travel as decimal strings so JSON consumers do not lose precision.
mod u64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PureValue {
    U8(u8),
    U64(#[serde(with = "u64_string")] u64),
    Bool(bool),
    String(String),
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Argument {
    Pure { value: PureValue },
    Object { id: String },
    /// Output `result` of command `index`.
    NestedResult { index: u16, result: u16 },
}

impl Argument {
    pub fn u8(value: u8) -> Self {
        Argument::Pure { value: PureValue::U8(value) }
    }

    pub fn u64(value: u64) -> Self {
        Argument::Pure { value: PureValue::U64(value) }
    }

    pub fn bool(value: bool) -> Self {
        Argument::Pure { value: PureValue::Bool(value) }
    }

    pub fn string(value: &str) -> Self {
        Argument::Pure { value: PureValue::String(value.to_string()) }
    }

    pub fn address(value: &str) -> Self {
        Argument::Pure { value: PureValue::Address(value.to_string()) }
    }

    pub fn object(id: &str) -> Self {
        Argument::Object { id: id.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    MoveCall { target: String, arguments: Vec<Argument> },
    SplitCoins { coin: Argument, amounts: Vec<Argument> },
    MergeCoins { destination: Argument, sources: Vec<Argument> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub commands: Vec<Command>,
}

impl Transaction {
    pub fn move_call_targets(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::MoveCall { target, .. } => Some(target.as_str()),
                _ => None,
            })
            .collect()
    }
}

pub struct TransactionBuilder {
    sender: String,
    commands: Vec<Command>,
}

impl TransactionBuilder {
    pub fn new(sender: &str) -> Result<Self> {
        if !is_sui_address(sender) {
            anyhow::bail!("Invalid sender address: {}", sender);
        }

        Ok(Self {
            sender: sender.to_string(),
            commands: Vec::new(),
        })
    }

    fn push(&mut self, command: Command) -> u16 {
        self.commands.push(command);
        (self.commands.len() - 1) as u16
    }

    /// Add a move call and return a handle to its first return value.
    pub fn move_call(&mut self, target: String, arguments: Vec<Argument>) -> Argument {
        let index = self.push(Command::MoveCall { target, arguments });
        Argument::NestedResult { index, result: 0 }
    }

    /// Split `amount` off `coin` and return the new coin.
    pub fn split_coin(&mut self, coin: Argument, amount: u64) -> Argument {
        let index = self.push(Command::SplitCoins {
            coin,
            amounts: vec![Argument::u64(amount)],
        });
        Argument::NestedResult { index, result: 0 }
    }

    pub fn merge_coins(&mut self, destination: Argument, sources: Vec<Argument>) {
        if sources.is_empty() {
            return;
        }
        self.push(Command::MergeCoins { destination, sources });
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn finish(self) -> Transaction {
        Transaction {
            sender: self.sender,
            commands: self.commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        assert!(is_sui_address("0x6"));
        assert!(is_sui_address(&format!("0x{}", "a".repeat(64))));
        assert!(!is_sui_address("0x"));
        assert!(!is_sui_address("6"));
        assert!(!is_sui_address(&format!("0x{}", "a".repeat(65))));
        assert!(TransactionBuilder::new("alice").is_err());
    }

    #[test]
    fn test_results_reference_their_command() {
        let mut tb = TransactionBuilder::new("0xa11ce").unwrap();
        let coin = tb.split_coin(Argument::object("0xc0"), 10);
        let out = tb.move_call("0x1::m::f".to_string(), vec![coin.clone()]);

        assert_eq!(coin, Argument::NestedResult { index: 0, result: 0 });
        assert_eq!(out, Argument::NestedResult { index: 1, result: 0 });

        tb.merge_coins(Argument::object("0xc0"), vec![]);
        assert_eq!(tb.len(), 2);
    }

    #[test]
    fn test_wire_format() {
        let mut tb = TransactionBuilder::new("0xa11ce").unwrap();
        tb.move_call(
            "0x1::m::f".to_string(),
            vec![Argument::u64(u64::MAX), Argument::object("0x6")],
        );
        let value = serde_json::to_value(tb.finish()).unwrap();

        let call = &value["commands"][0];
        assert_eq!(call["command"], "moveCall");
        assert_eq!(call["arguments"][0]["kind"], "pure");
        assert_eq!(call["arguments"][0]["value"]["type"], "u64");
        assert_eq!(call["arguments"][0]["value"]["value"], "18446744073709551615");
        assert_eq!(call["arguments"][1]["id"], "0x6");

        let back: Transaction = serde_json::from_value(value).unwrap();
        assert_eq!(back.move_call_targets(), vec!["0x1::m::f"]);
    }
}
