use rand::Rng;

const CUBE_FACES: [&str; 6] = ["U", "D", "L", "R", "F", "B"];
const TWO_BY_TWO_FACES: [usize; 3] = [0, 3, 4];
const CUBE_SUFFIXES: [&str; 3] = ["", "'", "2"];

const PYRAMINX_FACES: [&str; 4] = ["U", "L", "R", "B"];
const PYRAMINX_TIPS: [&str; 4] = ["u", "l", "r", "b"];
const SKEWB_FACES: [&str; 4] = ["R", "U", "L", "B"];
const TURN_SUFFIXES: [&str; 2] = ["", "'"];

/// Opposite faces share an axis: U/D, L/R, F/B.
fn cube_axis(face: usize) -> usize {
    face / 2
}

/// Picks `length` faces from `choices` so that no face repeats back to back and
/// no axis is turned three times in a row.
fn face_sequence<R, A>(rng: &mut R, choices: &[usize], length: usize, axis: A) -> Vec<usize>
where
    R: Rng + ?Sized,
    A: Fn(usize) -> usize,
{
    let mut faces: Vec<usize> = Vec::with_capacity(length);
    while faces.len() < length {
        let face = choices[rng.gen_range(0..choices.len())];
        let blocked = match faces.as_slice() {
            [.., last] if *last == face => true,
            [.., before, last] => axis(*before) == axis(*last) && axis(*last) == axis(face),
            _ => false,
        };
        if !blocked {
            faces.push(face);
        }
    }
    faces
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

pub(super) fn nxn<R: Rng + ?Sized>(rng: &mut R, size: u8, length: usize) -> String {
    let all_faces: Vec<usize> = (0..CUBE_FACES.len()).collect();
    let choices: &[usize] = if size == 2 {
        &TWO_BY_TWO_FACES[..]
    } else {
        &all_faces[..]
    };
    let max_width = (size / 2).max(1);

    face_sequence(rng, choices, length, cube_axis)
        .into_iter()
        .map(|face| {
            let width = rng.gen_range(1..=max_width);
            let suffix = pick(rng, &CUBE_SUFFIXES);
            match width {
                1 => format!("{}{suffix}", CUBE_FACES[face]),
                2 => format!("{}w{suffix}", CUBE_FACES[face]),
                _ => format!("{width}{}w{suffix}", CUBE_FACES[face]),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) fn pyraminx<R: Rng + ?Sized>(rng: &mut R) -> String {
    let choices: Vec<usize> = (0..PYRAMINX_FACES.len()).collect();
    let mut moves: Vec<String> = face_sequence(rng, &choices, 11, |face| face)
        .into_iter()
        .map(|face| format!("{}{}", PYRAMINX_FACES[face], pick(rng, &TURN_SUFFIXES)))
        .collect();

    for tip in PYRAMINX_TIPS {
        match rng.gen_range(0..3) {
            1 => moves.push(tip.to_string()),
            2 => moves.push(format!("{tip}'")),
            _ => {}
        }
    }
    moves.join(" ")
}

pub(super) fn skewb<R: Rng + ?Sized>(rng: &mut R) -> String {
    let choices: Vec<usize> = (0..SKEWB_FACES.len()).collect();
    face_sequence(rng, &choices, 9, |face| face)
        .into_iter()
        .map(|face| format!("{}{}", SKEWB_FACES[face], pick(rng, &TURN_SUFFIXES)))
        .collect::<Vec<_>>()
        .join(" ")
}
