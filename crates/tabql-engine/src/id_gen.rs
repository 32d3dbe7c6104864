//! A monotonic `table_id` source, grounded on `prqlc::utils::id_gen::NameGenerator`:
//! a prefix plus a counter, yielding `"$0"`, `"$1"`, … by default. Determinism
//! matters here — two evaluations of the same DAG must allocate ids in the
//! same sequence, so this is a plain counter rather than anything hash-based.

#[derive(Debug)]
pub struct NameGenerator {
    prefix: &'static str,
    next_id: usize,
}

impl NameGenerator {
    pub fn new(prefix: &'static str) -> Self {
        NameGenerator { prefix, next_id: 0 }
    }

    pub fn gen(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("{}{}", self.prefix, id)
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        NameGenerator::new("$")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn yields_dollar_prefixed_sequence() {
        let mut gen = NameGenerator::default();
        assert_eq!(gen.gen(), "$0");
        assert_eq!(gen.gen(), "$1");
        assert_eq!(gen.gen(), "$2");
    }
}
