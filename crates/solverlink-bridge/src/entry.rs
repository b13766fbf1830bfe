//! Host entry-point naming
//!
//! Each native symbol is exposed to the host under a deterministic name:
//! `Java_` + escaped namespace + `_` + escaped symbol, where the namespace's
//! `.`/`/` separators become `_` and every component is escaped so the
//! mapping stays reversible:
//!
//! | Character                 | Escape    |
//! |---------------------------|-----------|
//! | ASCII letter or digit     | itself    |
//! | `_`                       | `_1`      |
//! | `;`                       | `_2`      |
//! | `[`                       | `_3`      |
//! | anything else             | `_0xxxx` (lower-case hex UTF-16 unit) |

use crate::native::SYMBOLS;

/// Prefix of every entry-point name
pub const ENTRY_PREFIX: &str = "Java_";

fn escape_component(component: &str, out: &mut String) {
    for ch in component.chars() {
        match ch {
            c if c.is_ascii_alphanumeric() => out.push(c),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("_0{:04x}", unit));
                }
            }
        }
    }
}

/// Entry-point name for `symbol` under the dotted (or slashed) `namespace`
pub fn entry_point(namespace: &str, symbol: &str) -> String {
    let mut name = String::with_capacity(ENTRY_PREFIX.len() + namespace.len() + symbol.len() + 8);
    name.push_str(ENTRY_PREFIX);

    for (i, component) in namespace.split(['.', '/']).enumerate() {
        if i > 0 {
            name.push('_');
        }
        escape_component(component, &mut name);
    }

    name.push('_');
    escape_component(symbol, &mut name);
    name
}

/// `(symbol, entry point)` for every native symbol, in declaration order
pub fn entry_points(namespace: &str) -> Vec<(&'static str, String)> {
    SYMBOLS
        .iter()
        .map(|&symbol| (symbol, entry_point(namespace, symbol)))
        .collect()
}
