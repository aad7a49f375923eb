//! Filter, sort and projection evaluation for the in-memory collection.
//!
//! Covers the subset of MongoDB query semantics callers commonly send:
//! equality (including array membership), comparison operators, `$in`/`$nin`,
//! `$exists`, and the `$and`/`$or`/`$nor` combinators. Anything else is
//! rejected the way a server would reject a malformed filter.

use std::cmp::Ordering;

use bson::{Bson, Document};

use super::{StoreError, StoreResult};

pub(super) fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for clause in clauses(key, condition)? {
                    if matches(doc, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            other if other.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown top level operator: {other}"
                )));
            }
            path => field_matches(lookup(doc, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(operator: &str, condition: &'a Bson) -> StoreResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(StoreError::InvalidFilter(format!(
            "{operator} must be an array"
        )));
    };
    if items.is_empty() {
        return Err(StoreError::InvalidFilter(format!(
            "{operator} must be a nonempty array"
        )));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            _ => Err(StoreError::InvalidFilter(format!(
                "{operator} entries must be objects"
            ))),
        })
        .collect()
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    match condition {
        Bson::Document(ops) if is_operator_document(ops) => {
            for (op, operand) in ops {
                if !operator_matches(value, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(equals(value, condition)),
    }
}

fn is_operator_document(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn operator_matches(value: Option<&Bson>, op: &str, operand: &Bson) -> StoreResult<bool> {
    let matched = match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" | "$gte" | "$lt" | "$lte" if matches!(operand, Bson::Decimal128(_)) => {
            return Err(StoreError::InvalidFilter(format!(
                "{op} on Decimal128 is not supported by the in-memory collection"
            )));
        }
        "$gt" => ordered(value, operand, |ord| ord == Ordering::Greater),
        "$gte" => ordered(value, operand, |ord| ord != Ordering::Less),
        "$lt" => ordered(value, operand, |ord| ord == Ordering::Less),
        "$lte" => ordered(value, operand, |ord| ord != Ordering::Greater),
        "$in" => in_list(value, op, operand)?,
        "$nin" => !in_list(value, op, operand)?,
        "$exists" => value.is_some() == truthy(operand),
        other => {
            return Err(StoreError::InvalidFilter(format!("unknown operator: {other}")));
        }
    };
    Ok(matched)
}

fn in_list(value: Option<&Bson>, op: &str, operand: &Bson) -> StoreResult<bool> {
    let Bson::Array(candidates) = operand else {
        return Err(StoreError::InvalidFilter(format!("{op} needs an array")));
    };
    Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}

fn equals(value: Option<&Bson>, target: &Bson) -> bool {
    match value {
        None => matches!(target, Bson::Null),
        Some(Bson::Array(items)) if !matches!(target, Bson::Array(_)) => {
            items.iter().any(|item| same(item, target))
        }
        Some(value) => same(value, target),
    }
}

fn same(left: &Bson, right: &Bson) -> bool {
    type_rank(left) == type_rank(right) && compare(left, right) == Ordering::Equal
}

fn ordered(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |candidate: &Bson| {
        type_rank(candidate) == type_rank(operand) && accept(compare(candidate, operand))
    };
    match value {
        None => false,
        Some(Bson::Array(items)) if !matches!(operand, Bson::Array(_)) => items.iter().any(check),
        Some(value) => check(value),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Resolves a dotted path through nested documents.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Canonical BSON type ordering used when comparing values of different types.
const fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn compare(left: &Bson, right: &Bson) -> Ordering {
    let rank = type_rank(left).cmp(&type_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }
    match (left, right) {
        (Bson::Int32(a), Bson::Int32(b)) => a.cmp(b),
        (Bson::Int64(a), Bson::Int64(b)) => a.cmp(b),
        (Bson::String(a) | Bson::Symbol(a), Bson::String(b) | Bson::Symbol(b)) => a.cmp(b),
        (Bson::Document(a), Bson::Document(b)) => compare_documents(a, b),
        (Bson::Array(a), Bson::Array(b)) => compare_sequences(a.iter(), b.iter()),
        (Bson::Binary(a), Bson::Binary(b)) => a.bytes.cmp(&b.bytes),
        (Bson::ObjectId(a), Bson::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
        (Bson::Boolean(a), Bson::Boolean(b)) => a.cmp(b),
        (Bson::DateTime(a), Bson::DateTime(b)) => a.cmp(b),
        (Bson::Timestamp(a), Bson::Timestamp(b)) => {
            (a.time, a.increment).cmp(&(b.time, b.increment))
        }
        // Decimal128 only equals an identical Decimal128 and sorts after other numbers.
        (Bson::Decimal128(a), Bson::Decimal128(b)) => a.bytes().cmp(&b.bytes()),
        (Bson::Decimal128(_), _) => Ordering::Greater,
        (_, Bson::Decimal128(_)) => Ordering::Less,
        _ => match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn compare_documents(left: &Document, right: &Document) -> Ordering {
    for ((left_key, left_value), (right_key, right_value)) in left.iter().zip(right.iter()) {
        let ord = compare(left_value, right_value).then_with(|| left_key.cmp(right_key));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

fn compare_sequences<'a>(
    mut left: impl Iterator<Item = &'a Bson>,
    mut right: impl Iterator<Item = &'a Bson>,
) -> Ordering {
    loop {
        match (left.next(), right.next()) {
            (Some(a), Some(b)) => {
                let ord = compare(a, b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Stable multi-key sort; missing fields order as null.
pub(super) fn sort_documents(documents: &mut [Document], sort: &Document) -> StoreResult<()> {
    let mut keys = Vec::with_capacity(sort.len());
    for (field, direction) in sort {
        let ascending = match as_f64(direction) {
            Some(n) if n > 0.0 => true,
            Some(n) if n < 0.0 => false,
            _ => {
                return Err(StoreError::InvalidInput(format!(
                    "bad sort specification for field {field}"
                )));
            }
        };
        keys.push((field.as_str(), ascending));
    }

    documents.sort_by(|left, right| {
        for (field, ascending) in &keys {
            let a = lookup(left, field).unwrap_or(&Bson::Null);
            let b = lookup(right, field).unwrap_or(&Bson::Null);
            let ord = compare(a, b);
            let ord = if *ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

/// Applies an inclusion or exclusion projection over top-level fields.
pub(super) fn project(document: Document, projection: &Document) -> StoreResult<Document> {
    let mut include_id = true;
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for (field, flag) in projection {
        let keep = match flag {
            Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => truthy(flag),
            _ => {
                return Err(StoreError::InvalidInput(format!(
                    "unsupported projection value for field {field}"
                )));
            }
        };
        if field == "_id" {
            include_id = keep;
        } else if keep {
            included.push(field.as_str());
        } else {
            excluded.push(field.as_str());
        }
    }

    if !included.is_empty() && !excluded.is_empty() {
        return Err(StoreError::InvalidInput(format!(
            "cannot do exclusion on field {} in inclusion projection",
            excluded[0]
        )));
    }

    let projected = document
        .into_iter()
        .filter(|(key, _)| {
            if key == "_id" {
                include_id
            } else if included.is_empty() {
                !excluded.contains(&key.as_str())
            } else {
                included.contains(&key.as_str())
            }
        })
        .collect();
    Ok(projected)
}
