use rand::Rng;

const SLASHES: usize = 12;
const SLOTS: usize = 12;
const HALF: usize = SLOTS / 2;

/// One layer as twelve 30° slots. A corner covers two neighbouring slots with
/// the same piece id, an edge covers one.
type Layer = [u8; SLOTS];

/// Four corner-edge pairs, starting on a corner.
fn solved_layer(offset: u8) -> Layer {
    let mut layer = [0; SLOTS];
    let mut piece = offset;
    let mut slot = 0;
    while slot < SLOTS {
        layer[slot] = piece;
        layer[slot + 1] = piece;
        layer[slot + 2] = piece + 1;
        piece += 2;
        slot += 3;
    }
    layer
}

/// Turns the layer clockwise by `amount` slots (negative turns counterclockwise).
fn rotate(layer: &Layer, amount: i32) -> Layer {
    let shift = amount.rem_euclid(SLOTS as i32) as usize;
    let mut turned = [0; SLOTS];
    for (slot, piece) in layer.iter().enumerate() {
        turned[(slot + shift) % SLOTS] = *piece;
    }
    turned
}

/// True when no piece straddles the slice line at slots 0 and 6.
fn can_slice(layer: &Layer) -> bool {
    layer[SLOTS - 1] != layer[0] && layer[HALF - 1] != layer[HALF]
}

/// Swaps the right halves of both layers.
fn slice(top: &mut Layer, bottom: &mut Layer) {
    let top_half: Vec<u8> = top[HALF..].iter().rev().copied().collect();
    let bottom_half: Vec<u8> = bottom[HALF..].iter().rev().copied().collect();
    top[HALF..].copy_from_slice(&bottom_half);
    bottom[HALF..].copy_from_slice(&top_half);
}

/// `(top,bottom) / ...` random-move scramble. Only turns that leave both layers
/// sliceable are drawn, so every slash is physically possible.
pub(super) fn scramble<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut top = solved_layer(0);
    let mut bottom = solved_layer(100);
    let mut steps = Vec::with_capacity(SLASHES);

    for _ in 0..SLASHES {
        let mut legal = Vec::new();
        for up in -5..=6 {
            for down in -5..=6 {
                if (up, down) == (0, 0) {
                    continue;
                }
                if can_slice(&rotate(&top, up)) && can_slice(&rotate(&bottom, down)) {
                    legal.push((up, down));
                }
            }
        }

        let (up, down) = legal[rng.gen_range(0..legal.len())];
        top = rotate(&top, up);
        bottom = rotate(&bottom, down);
        slice(&mut top, &mut bottom);
        steps.push(format!("({up},{down})"));
    }

    let mut scramble = steps.join(" / ");
    scramble.push_str(" /");
    scramble
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn parse_turn(step: &str) -> (i32, i32) {
        let inner = step.trim().trim_start_matches('(').trim_end_matches(')');
        let (up, down) = inner.split_once(',').unwrap();
        (up.parse().unwrap(), down.parse().unwrap())
    }

    #[test]
    fn solved_layers_are_sliceable_at_both_halves() {
        let layer = solved_layer(0);
        assert!(can_slice(&layer));
        assert!(can_slice(&rotate(&layer, 6)));
        assert!(can_slice(&rotate(&layer, 1)));
        assert!(!can_slice(&rotate(&layer, 2)));
    }

    #[test]
    fn every_slash_is_legal_when_replayed() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..25 {
            let scramble = scramble(&mut rng);
            assert!(scramble.ends_with(" /"));

            let mut top = solved_layer(0);
            let mut bottom = solved_layer(100);
            let steps: Vec<&str> = scramble.trim_end_matches(" /").split(" / ").collect();
            assert_eq!(steps.len(), SLASHES);
            for step in steps {
                let (up, down) = parse_turn(step);
                assert!((-5..=6).contains(&up) && (-5..=6).contains(&down));
                assert_ne!((up, down), (0, 0));
                top = rotate(&top, up);
                bottom = rotate(&bottom, down);
                assert!(can_slice(&top) && can_slice(&bottom), "{scramble}");
                slice(&mut top, &mut bottom);
            }
        }
    }
}
