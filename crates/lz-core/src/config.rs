use std::sync::OnceLock;

/// A `LAZULI_*` switch, read from the environment on first use.
struct Switch {
    key: &'static str,
    value: OnceLock<bool>,
}

impl Switch {
    const fn new(key: &'static str) -> Self {
        Self {
            key,
            value: OnceLock::new(),
        }
    }

    fn is_on(&self) -> bool {
        *self
            .value
            .get_or_init(|| switch_on(std::env::var(self.key).ok().as_deref()))
    }
}

/// Unset, empty, `0`, `false`, `no` and `off` turn a switch off; anything else turns it on.
fn switch_on(raw: Option<&str>) -> bool {
    let Some(raw) = raw.map(str::trim) else {
        return false;
    };
    !(raw.is_empty()
        || raw == "0"
        || ["false", "no", "off"]
            .iter()
            .any(|off| raw.eq_ignore_ascii_case(off)))
}

static RECOVERY: Switch = Switch::new("LAZULI_RECOVERY");
static NO_SPECIALIZE: Switch = Switch::new("LAZULI_NO_SPECIALIZE");
static NO_FOLD: Switch = Switch::new("LAZULI_NO_FOLD");

/// Collect analysis errors instead of aborting on the first one.
pub fn recovery_mode() -> bool {
    RECOVERY.is_on()
}

pub fn specialization_enabled() -> bool {
    !NO_SPECIALIZE.is_on()
}

pub fn constant_folding_enabled() -> bool {
    !NO_FOLD.is_on()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_values() {
        for raw in [None, Some(""), Some(" 0 "), Some("False"), Some("NO"), Some("off")] {
            assert!(!switch_on(raw), "{:?} should be off", raw);
        }
        for raw in [Some("1"), Some("true"), Some("yes"), Some("on")] {
            assert!(switch_on(raw), "{:?} should be on", raw);
        }
    }

    #[test]
    fn unset_switch_is_off() {
        let switch = Switch::new("LAZULI_TEST_SWITCH_THAT_IS_NEVER_SET");
        assert!(!switch.is_on());
    }
}
