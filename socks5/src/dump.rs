use std::fmt;

use crate::protocol::{ParsedRequest, SOCKS_VERSION};

const HEADERS: [&str; 6] = ["VER", "CMD", "RSV", "ATYP", "ADDR", "PORT"];

/// 以表格形式展示解析后的请求, 仅用于日志
///
/// ```text
/// +-----+-----+-----+------+-----------+------+
/// | VER | CMD | RSV | ATYP |   ADDR    | PORT |
/// +=====+=====+=====+======+===========+======+
/// |  5  |  1  |  0  |  1   | 127.0.0.1 |  80  |
/// +-----+-----+-----+------+-----------+------+
/// ```
pub struct RequestTable<'a> {
    request: &'a ParsedRequest,
}

impl<'a> RequestTable<'a> {
    pub fn new(request: &'a ParsedRequest) -> Self {
        Self { request }
    }

    fn cells(&self) -> [String; 6] {
        let req = self.request;
        [
            SOCKS_VERSION.to_string(),
            req.command.code().to_string(),
            req.reserved.to_string(),
            req.address_type.code().to_string(),
            req.host.clone(),
            req.port.to_string(),
        ]
    }
}

impl fmt::Display for RequestTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = self.cells();
        let widths: Vec<usize> = HEADERS
            .iter()
            .zip(cells.iter())
            .map(|(h, c)| h.chars().count().max(c.chars().count()) + 2)
            .collect();

        write_rule(f, &widths, '-')?;
        write_row(f, &widths, &HEADERS)?;
        write_rule(f, &widths, '=')?;
        let values: Vec<&str> = cells.iter().map(String::as_str).collect();
        write_row(f, &widths, &values)?;
        write_rule(f, &widths, '-')
    }
}

fn write_rule(f: &mut fmt::Formatter<'_>, widths: &[usize], fill: char) -> fmt::Result {
    for w in widths {
        f.write_str("+")?;
        for _ in 0..*w {
            write!(f, "{}", fill)?;
        }
    }
    writeln!(f, "+")
}

fn write_row(f: &mut fmt::Formatter<'_>, widths: &[usize], values: &[&str]) -> fmt::Result {
    for (value, w) in values.iter().zip(widths) {
        write!(f, "|{:^width$}", value, width = *w)?;
    }
    writeln!(f, "|")
}
