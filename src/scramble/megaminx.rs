use rand::Rng;

const LINES: usize = 7;
const TURNS_PER_LINE: usize = 10;

/// Pochmann-style lines: alternating `R`/`D` double turns closed by a `U` turn.
pub(super) fn scramble<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..LINES)
        .map(|_| {
            let mut line: Vec<String> = (0..TURNS_PER_LINE)
                .map(|i| {
                    let face = if i % 2 == 0 { "R" } else { "D" };
                    let direction = if rng.gen_bool(0.5) { "++" } else { "--" };
                    format!("{face}{direction}")
                })
                .collect();
            line.push(if rng.gen_bool(0.5) { "U" } else { "U'" }.to_string());
            line.join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn seven_lines_of_eleven_turns() {
        let mut rng = StdRng::seed_from_u64(9);
        let scramble = scramble(&mut rng);
        let lines: Vec<&str> = scramble.lines().collect();
        assert_eq!(lines.len(), LINES);
        for line in lines {
            let turns: Vec<&str> = line.split(' ').collect();
            assert_eq!(turns.len(), TURNS_PER_LINE + 1);
            assert!(turns[0].starts_with('R'));
            assert!(turns[1].starts_with('D'));
            assert!(turns[TURNS_PER_LINE].starts_with('U'));
        }
    }
}
