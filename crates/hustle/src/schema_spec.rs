//! Parses `--column name:type[:pk][:null]` flags (spec §6's `create_table`
//! surfaced as a CLI argument, since the wire contract itself takes an
//! already-built schema).

use hustle_core::{Column, ColumnType, HustleError, Schema};

pub fn parse_schema(specs: &[String]) -> hustle_core::Result<Schema> {
    let mut columns = Vec::with_capacity(specs.len());
    let mut primary_key = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        let mut parts = spec.split(':');
        let name = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HustleError::plan_error(format!("empty column name in `{spec}`")))?;
        let type_token = parts
            .next()
            .ok_or_else(|| HustleError::plan_error(format!("column `{name}` is missing a type")))?;
        let column_type = parse_type(type_token)?;

        let mut nullable = true;
        let mut unique = false;
        for flag in parts {
            match flag {
                "pk" => {
                    primary_key.push(index);
                    nullable = false;
                    unique = true;
                }
                "null" => nullable = true,
                "notnull" => nullable = false,
                "unique" => unique = true,
                other => return Err(HustleError::plan_error(format!("unknown column flag `{other}` in `{spec}`"))),
            }
        }

        let mut column = Column::new(name, column_type);
        column.nullable = nullable;
        column.unique = unique;
        columns.push(column);
    }

    Ok(Schema::new(columns).with_primary_key(primary_key))
}

fn parse_type(token: &str) -> hustle_core::Result<ColumnType> {
    if let Some(width) = token.strip_prefix("bytes(").and_then(|rest| rest.strip_suffix(')')) {
        let width: u16 = width
            .parse()
            .map_err(|_| HustleError::plan_error(format!("invalid byte width `{width}`")))?;
        return Ok(ColumnType::FixedBytes(width));
    }
    match token {
        "int" | "int64" => Ok(ColumnType::Int64),
        "text" | "utf8" => Ok(ColumnType::Utf8),
        other => Err(HustleError::plan_error(format!("unknown column type `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primary_key_and_nullable_columns() {
        let schema = parse_schema(&["id:int:pk".to_string(), "name:text:null".to_string()]).unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.primary_key, vec![0]);
        assert!(!schema.columns[0].nullable);
        assert!(schema.columns[1].nullable);
    }

    #[test]
    fn parses_fixed_width_bytes() {
        let schema = parse_schema(&["blob:bytes(16)".to_string()]).unwrap();
        assert_eq!(schema.columns[0].ty, ColumnType::FixedBytes(16));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(parse_schema(&["x:weird".to_string()]).is_err());
    }
}
