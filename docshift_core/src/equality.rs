use serde_yaml_ng::Mapping;
use serde_yaml_ng::Number;
use serde_yaml_ng::Value;

/// Deep equality over parsed YAML trees.
///
/// Sequences compare element-wise in order, mappings compare by key set and
/// value regardless of key order, and two NaN numbers are equal to each other
/// so that a second pass over already migrated content is recognized as a
/// no-op.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Null, Value::Null) => true,
		(Value::Bool(a), Value::Bool(b)) => a == b,
		(Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
		(Value::String(a), Value::String(b)) => a == b,
		(Value::Sequence(a), Value::Sequence(b)) => {
			a.len() == b.len()
				&& a
					.iter()
					.zip(b.iter())
					.all(|(a, b)| structurally_equal(a, b))
		}
		(Value::Mapping(a), Value::Mapping(b)) => mappings_equal(a, b),
		(Value::Tagged(a), Value::Tagged(b)) => {
			a.tag == b.tag && structurally_equal(&a.value, &b.value)
		}
		_ => false,
	}
}

/// Key-order-insensitive mapping equality.
pub fn mappings_equal(a: &Mapping, b: &Mapping) -> bool {
	a.len() == b.len()
		&& a.iter().all(|(key, value)| {
			b.get(key)
				.is_some_and(|other| structurally_equal(value, other))
		})
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
	if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
		return a == b;
	}
	if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
		return a == b;
	}

	match (a.as_f64(), b.as_f64()) {
		#[allow(clippy::float_cmp)]
		(Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
		_ => false,
	}
}
