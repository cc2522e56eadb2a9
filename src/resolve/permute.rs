//! Query generation for the permutation fallback.

/// Ordered search queries built from leftover tokens plus a fixed suffix.
///
/// Permutations are generated longest first, and within one length in
/// lexicographic index order over `tokens`. The last query is always the
/// fixed text alone. Bags larger than `max_tokens` are not permuted: they
/// produce one query with every token in order, then the fixed text.
pub fn permutation_queries(tokens: &[&str], fixed_text: &str, max_tokens: usize) -> Vec<String> {
    let join = |parts: &[&str]| -> String {
        if parts.is_empty() {
            fixed_text.to_string()
        } else if fixed_text.is_empty() {
            parts.join(", ")
        } else {
            format!("{}, {}", parts.join(", "), fixed_text)
        }
    };

    if tokens.len() > max_tokens {
        return vec![join(tokens), join(&[])];
    }

    let mut queries = Vec::new();
    for length in (0..=tokens.len()).rev() {
        for order in k_permutations(tokens.len(), length) {
            let parts: Vec<&str> = order.iter().map(|&idx| tokens[idx]).collect();
            queries.push(join(&parts));
        }
    }
    queries
}

/// All ordered selections of `k` distinct indices out of `n`
fn k_permutations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn extend(n: usize, k: usize, used: &mut [bool], current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for idx in 0..n {
            if used[idx] {
                continue;
            }
            used[idx] = true;
            current.push(idx);
            extend(n, k, used, current, out);
            current.pop();
            used[idx] = false;
        }
    }

    let mut out = Vec::new();
    let mut used = vec![false; n];
    extend(n, k, &mut used, &mut Vec::with_capacity(k), &mut out);
    out
}
