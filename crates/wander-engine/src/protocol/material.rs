use crate::error::ProtocolError;

const FIELDS: usize = 5;

/// One line of the material section.
///
/// `offset` and `length` are in elements of the uploaded buffer. The last two
/// fields are reserved and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRecord {
    pub tag: String,
    pub offset: u32,
    pub length: u32,
    pub reserved: [String; 2],
}

/// Parses newline-separated `tag,offset,length,reserved,reserved` records.
///
/// Blank lines (including a trailing newline) are skipped.
pub fn parse_material(text: &str) -> Result<Vec<MaterialRecord>, ProtocolError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(i + 1, line))
        .collect()
}

fn parse_line(line_no: usize, line: &str) -> Result<MaterialRecord, ProtocolError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != FIELDS {
        return Err(ProtocolError::MalformedMaterial {
            line: line_no,
            reason: format!("expected {FIELDS} fields, found {}", fields.len()),
        });
    }

    let number = |field: &str, what: &str| {
        field
            .trim()
            .parse::<u32>()
            .map_err(|e| ProtocolError::MalformedMaterial {
                line: line_no,
                reason: format!("bad {what} `{field}`: {e}"),
            })
    };

    Ok(MaterialRecord {
        tag: fields[0].to_string(),
        offset: number(fields[1], "offset")?,
        length: number(fields[2], "length")?,
        reserved: [fields[3].to_string(), fields[4].to_string()],
    })
}
