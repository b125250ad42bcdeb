//! Ordered fallback over a candidate list.
//!
//! One combinator serves every task type: a candidate is skipped when its
//! attempt fails or when the accept predicate rejects its value, unless it is
//! the last candidate, whose successful value is always returned.

use std::future::Future;

/// The value a candidate produced, with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<T> {
    pub index: usize,
    pub value: T,
    /// Candidates attempted, including the accepted one.
    pub tried: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackError<E> {
    NoCandidates,
    Exhausted { tried: usize, last: E },
}

/// Try `candidates` in order until one is accepted.
///
/// `accept` runs on every successful value. Failed attempts are remembered
/// and the last one is returned when no candidate yields a value.
pub async fn try_in_order<'a, C, T, E, A, F, P>(
    candidates: &'a [C],
    mut attempt: A,
    mut accept: P,
) -> Result<Accepted<T>, FallbackError<E>>
where
    A: FnMut(usize, &'a C) -> F,
    F: Future<Output = Result<T, E>>,
    P: FnMut(usize, &C, &T) -> bool,
{
    let mut last = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let tried = index + 1;
        match attempt(index, candidate).await {
            Ok(value) => {
                let accepted = accept(index, candidate, &value);
                if accepted || tried == candidates.len() {
                    return Ok(Accepted {
                        index,
                        value,
                        tried,
                    });
                }
            }
            Err(e) => last = Some(e),
        }
    }

    match last {
        Some(last) => Err(FallbackError::Exhausted {
            tried: candidates.len(),
            last,
        }),
        None => Err(FallbackError::NoCandidates),
    }
}
