use super::{
    digit_value, integer_part, validate_order_key, KeyError, OrderKey, DIGITS, INTEGER_ZERO,
    SMALLEST_INTEGER,
};

/// Key strictly between `prev` and `next`
///
/// `None` means unbounded on that side. The result is deterministic for a
/// given pair of bounds.
///
/// # Errors
///
/// - `KeyError::Unordered` if `prev >= next` (e.g. two items share a key)
/// - `KeyError::InvalidKey` if a bound is malformed
/// - `KeyError::Exhausted` if the integer range is used up at that end
///
/// # Examples
///
/// ```rust
/// use leasetrack_ordering::key::{key_between, OrderKey};
///
/// let a2 = OrderKey::parse("a2").unwrap();
/// assert_eq!(key_between(Some(&a2), None).unwrap().as_str(), "a3");
///
/// let a0 = OrderKey::parse("a0").unwrap();
/// let a1 = OrderKey::parse("a1").unwrap();
/// assert_eq!(key_between(Some(&a0), Some(&a1)).unwrap().as_str(), "a0V");
/// ```
pub fn key_between(prev: Option<&OrderKey>, next: Option<&OrderKey>) -> Result<OrderKey, KeyError> {
    let a = prev.map(|k| k.as_str().as_bytes());
    let b = next.map(|k| k.as_str().as_bytes());
    between(a, b).map(OrderKey::from_bytes)
}

/// `count` strictly increasing keys between `prev` and `next`
///
/// With one side open the keys are consecutive integers, so a fresh
/// collection starts as `a0, a1, a2, …`. With both sides bounded the range is
/// bisected recursively, which spreads the keys evenly.
pub fn keys_between(
    prev: Option<&OrderKey>,
    next: Option<&OrderKey>,
    count: usize,
) -> Result<Vec<OrderKey>, KeyError> {
    let a = prev.map(|k| k.as_str().as_bytes().to_vec());
    let b = next.map(|k| k.as_str().as_bytes().to_vec());
    let keys = n_between(a.as_deref(), b.as_deref(), count)?;
    Ok(keys.into_iter().map(OrderKey::from_bytes).collect())
}

fn between(a: Option<&[u8]>, b: Option<&[u8]>) -> Result<Vec<u8>, KeyError> {
    if let Some(a) = a {
        validate_order_key(a)?;
    }
    if let Some(b) = b {
        validate_order_key(b)?;
    }
    if let (Some(a), Some(b)) = (a, b) {
        if a >= b {
            return Err(unordered(a, b));
        }
    }

    match (a, b) {
        (None, None) => Ok(INTEGER_ZERO.as_bytes().to_vec()),
        (None, Some(b)) => {
            let ib = integer_part(b)?;
            let fb = &b[ib.len()..];
            if ib == SMALLEST_INTEGER.as_bytes() {
                return Ok(concat(ib, &midpoint(&[], Some(fb))?));
            }
            if ib < b {
                return Ok(ib.to_vec());
            }
            decrement_integer(ib)?.ok_or(KeyError::Exhausted)
        }
        (Some(a), None) => {
            let ia = integer_part(a)?;
            let fa = &a[ia.len()..];
            match increment_integer(ia)? {
                Some(i) => Ok(i),
                None => Ok(concat(ia, &midpoint(fa, None)?)),
            }
        }
        (Some(a), Some(b)) => {
            let ia = integer_part(a)?;
            let fa = &a[ia.len()..];
            let ib = integer_part(b)?;
            let fb = &b[ib.len()..];
            if ia == ib {
                return Ok(concat(ia, &midpoint(fa, Some(fb))?));
            }
            let i = increment_integer(ia)?.ok_or(KeyError::Exhausted)?;
            if i.as_slice() < b {
                return Ok(i);
            }
            Ok(concat(ia, &midpoint(fa, None)?))
        }
    }
}

fn n_between(a: Option<&[u8]>, b: Option<&[u8]>, n: usize) -> Result<Vec<Vec<u8>>, KeyError> {
    match n {
        0 => Ok(Vec::new()),
        1 => Ok(vec![between(a, b)?]),
        _ => match (a, b) {
            (_, None) => {
                let mut keys = Vec::with_capacity(n);
                let mut c = between(a, None)?;
                for _ in 1..n {
                    let next = between(Some(c.as_slice()), None)?;
                    keys.push(std::mem::replace(&mut c, next));
                }
                keys.push(c);
                Ok(keys)
            }
            (None, Some(b)) => {
                let mut keys = Vec::with_capacity(n);
                let mut c = between(None, Some(b))?;
                for _ in 1..n {
                    let prev = between(None, Some(c.as_slice()))?;
                    keys.push(std::mem::replace(&mut c, prev));
                }
                keys.push(c);
                keys.reverse();
                Ok(keys)
            }
            (Some(a), Some(b)) => {
                let mid = n / 2;
                let c = between(Some(a), Some(b))?;
                let mut keys = n_between(Some(a), Some(c.as_slice()), mid)?;
                let right = n_between(Some(c.as_slice()), Some(b), n - mid - 1)?;
                keys.push(c);
                keys.extend(right);
                Ok(keys)
            }
        },
    }
}

/// Shortest digit string strictly between two fractions
///
/// `b = None` is the open upper end. Neither fraction may end in `'0'`.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Result<Vec<u8>, KeyError> {
    if let Some(b) = b {
        if a >= b {
            return Err(unordered(a, b));
        }
        if b.last() == Some(&b'0') {
            return Err(KeyError::invalid(b, "trailing zero"));
        }
    }
    if a.last() == Some(&b'0') {
        return Err(KeyError::invalid(a, "trailing zero"));
    }

    if let Some(b) = b {
        // Shared prefix, reading a missing digit of `a` as '0'.
        let n = b
            .iter()
            .enumerate()
            .take_while(|&(i, &d)| a.get(i).copied().unwrap_or(b'0') == d)
            .count();
        if n > 0 {
            let tail_a = a.get(n..).unwrap_or(&[]);
            return Ok(concat(&b[..n], &midpoint(tail_a, Some(&b[n..]))?));
        }
    }

    let digit_a = match a.first() {
        Some(&c) => digit_value(c).ok_or_else(|| KeyError::invalid(a, "non base-62 digit"))?,
        None => 0,
    };
    let digit_b = match b {
        Some(b) => {
            let first = *b.first().ok_or_else(|| unordered(a, b))?;
            digit_value(first).ok_or_else(|| KeyError::invalid(b, "non base-62 digit"))?
        }
        None => DIGITS.len(),
    };

    if digit_b > digit_a + 1 {
        // round((a + b) / 2)
        let mid = (digit_a + digit_b + 1) / 2;
        Ok(vec![DIGITS[mid]])
    } else if let Some(b) = b.filter(|b| b.len() > 1) {
        Ok(vec![b[0]])
    } else {
        let rest = a.get(1..).unwrap_or(&[]);
        Ok(concat(&[DIGITS[digit_a]], &midpoint(rest, None)?))
    }
}

/// Next integer, or `None` past the largest integer
fn increment_integer(x: &[u8]) -> Result<Option<Vec<u8>>, KeyError> {
    let int = integer_part(x)?;
    if int.len() != x.len() {
        return Err(KeyError::invalid(x, "not an integer"));
    }
    let head = x[0];
    let mut digits = x[1..].to_vec();

    let mut carry = true;
    for d in digits.iter_mut().rev() {
        let value = digit_value(*d).ok_or_else(|| KeyError::invalid(x, "non base-62 digit"))? + 1;
        if value == DIGITS.len() {
            *d = b'0';
        } else {
            *d = DIGITS[value];
            carry = false;
            break;
        }
    }

    if !carry {
        return Ok(Some(concat(&[head], &digits)));
    }
    match head {
        b'Z' => Ok(Some(INTEGER_ZERO.as_bytes().to_vec())),
        b'z' => Ok(None),
        _ => {
            let h = head + 1;
            if h > b'a' {
                digits.push(b'0');
            } else {
                digits.pop();
            }
            Ok(Some(concat(&[h], &digits)))
        }
    }
}

/// Previous integer, or `None` before the smallest integer
fn decrement_integer(x: &[u8]) -> Result<Option<Vec<u8>>, KeyError> {
    let int = integer_part(x)?;
    if int.len() != x.len() {
        return Err(KeyError::invalid(x, "not an integer"));
    }
    let head = x[0];
    let mut digits = x[1..].to_vec();
    let largest = DIGITS[DIGITS.len() - 1];

    let mut borrow = true;
    for d in digits.iter_mut().rev() {
        let value = digit_value(*d).ok_or_else(|| KeyError::invalid(x, "non base-62 digit"))?;
        if value == 0 {
            *d = largest;
        } else {
            *d = DIGITS[value - 1];
            borrow = false;
            break;
        }
    }

    if !borrow {
        return Ok(Some(concat(&[head], &digits)));
    }
    match head {
        b'a' => Ok(Some(vec![b'Z', largest])),
        b'A' => Ok(None),
        _ => {
            let h = head - 1;
            if h < b'Z' {
                digits.push(largest);
            } else {
                digits.pop();
            }
            Ok(Some(concat(&[h], &digits)))
        }
    }
}

fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

fn unordered(a: &[u8], b: &[u8]) -> KeyError {
    KeyError::Unordered {
        prev: String::from_utf8_lossy(a).into_owned(),
        next: String::from_utf8_lossy(b).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> OrderKey {
        OrderKey::from_raw(s)
    }

    fn between_str(a: Option<&str>, b: Option<&str>) -> Result<String, KeyError> {
        let a = a.map(key);
        let b = b.map(key);
        key_between(a.as_ref(), b.as_ref()).map(OrderKey::into_string)
    }

    #[test]
    fn test_known_keys() {
        let cases = [
            (None, None, "a0"),
            (None, Some("a0"), "Zz"),
            (None, Some("Zz"), "Zy"),
            (Some("a0"), None, "a1"),
            (Some("a1"), None, "a2"),
            (Some("a2"), None, "a3"),
            (Some("a0"), Some("a1"), "a0V"),
            (Some("a1"), Some("a2"), "a1V"),
            (Some("a0V"), Some("a1"), "a0l"),
            (Some("Zz"), Some("a0"), "ZzV"),
            (Some("Zz"), Some("a1"), "a0"),
            (None, Some("Y00"), "Xzzz"),
            (Some("bzz"), None, "c000"),
            (Some("a0"), Some("a0V"), "a0G"),
            (Some("a0"), Some("a0G"), "a08"),
            (Some("b125"), Some("b129"), "b127"),
            (Some("a0"), Some("a1V"), "a1"),
            (Some("Zz"), Some("a01"), "a0"),
            (None, Some("a0V"), "a0"),
            (None, Some("b999"), "b99"),
            (Some("Zz"), None, "a0"),
        ];
        for (a, b, expected) in cases {
            assert_eq!(
                between_str(a, b).unwrap(),
                expected,
                "key_between({a:?}, {b:?})"
            );
        }
    }

    #[test]
    fn test_largest_integer_falls_back_to_fraction() {
        let largest = format!("z{}", "z".repeat(26));
        let next = between_str(Some(&largest), None).unwrap();
        assert_eq!(next, format!("{largest}V"));
    }

    #[test]
    fn test_below_smallest_integer_uses_fraction() {
        let bound = format!("{SMALLEST_INTEGER}1");
        let below = between_str(None, Some(&bound)).unwrap();
        assert_eq!(below, format!("{SMALLEST_INTEGER}0V"));
        assert!(below < bound);
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(matches!(
            between_str(Some("a1"), Some("a0")),
            Err(KeyError::Unordered { .. })
        ));
        assert!(matches!(
            between_str(Some("a1"), Some("a1")),
            Err(KeyError::Unordered { .. })
        ));
        assert!(matches!(
            between_str(Some("a00"), None),
            Err(KeyError::InvalidKey { .. })
        ));
        assert!(matches!(
            between_str(Some("a00"), Some("a1")),
            Err(KeyError::InvalidKey { .. })
        ));
        assert!(matches!(
            between_str(Some("0"), Some("1")),
            Err(KeyError::InvalidKey { .. })
        ));
        assert!(matches!(
            between_str(None, Some(SMALLEST_INTEGER)),
            Err(KeyError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_keys_between_open_ends() {
        let keys = keys_between(None, None, 5).unwrap();
        let keys: Vec<_> = keys.iter().map(OrderKey::as_str).collect();
        assert_eq!(keys, vec!["a0", "a1", "a2", "a3", "a4"]);

        let a1 = key("a1");
        let before = keys_between(None, Some(&a1), 3).unwrap();
        let before: Vec<_> = before.iter().map(OrderKey::as_str).collect();
        assert_eq!(before, vec!["Zy", "Zz", "a0"]);

        let after = keys_between(Some(&a1), None, 2).unwrap();
        let after: Vec<_> = after.iter().map(OrderKey::as_str).collect();
        assert_eq!(after, vec!["a2", "a3"]);
    }

    #[test]
    fn test_keys_between_bounded_is_spread() {
        let (a0, a1) = (key("a0"), key("a1"));
        let keys = keys_between(Some(&a0), Some(&a1), 3).unwrap();
        let keys: Vec<_> = keys.iter().map(OrderKey::as_str).collect();
        assert_eq!(keys, vec!["a0G", "a0V", "a0l"]);
    }

    #[test]
    fn test_keys_between_zero() {
        assert!(keys_between(None, None, 0).unwrap().is_empty());
    }

    #[test]
    fn test_integer_rollover() {
        assert_eq!(between_str(Some("az"), None).unwrap(), "b00");
        assert_eq!(between_str(None, Some("b00")).unwrap(), "az");
    }
}
