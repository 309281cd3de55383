use labelmodel::labeling::augment::SourceVote;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Votes from independent sources that abstain at `abstain_rate` and are right with
/// probability `accuracy` when they vote; wrong votes are spread over the other classes.
pub struct SyntheticVotes {
    pub truth: Vec<usize>,
    pub rows: Vec<Vec<SourceVote>>,
}

pub fn synthetic_votes(
    seed: u64,
    rows: usize,
    sources: usize,
    classes: usize,
    accuracy: f32,
    abstain_rate: f32,
) -> SyntheticVotes {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut truth = Vec::with_capacity(rows);
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        let label = rng.random_range(0..classes);
        truth.push(label);
        let votes = (0..sources)
            .map(|_| {
                if rng.random::<f32>() < abstain_rate {
                    return SourceVote::Abstain;
                }
                if rng.random::<f32>() < accuracy {
                    SourceVote::Class(label)
                } else {
                    let offset = rng.random_range(1..classes);
                    SourceVote::Class((label + offset) % classes)
                }
            })
            .collect();
        out.push(votes);
    }
    SyntheticVotes { truth, rows: out }
}
