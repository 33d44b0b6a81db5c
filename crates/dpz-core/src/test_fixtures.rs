use crate::domain::{ProfileRecord, RecordName};

pub(crate) struct FixtureLayer {
    pub(crate) thickness: f64,
    pub(crate) weight: f64,
    pub(crate) strength: f64,
}

pub(crate) fn layer(thickness: f64, weight: f64, strength: f64) -> FixtureLayer {
    FixtureLayer {
        thickness,
        weight,
        strength,
    }
}

pub(crate) fn profile_text(layers: &[FixtureLayer]) -> String {
    let mut text = String::from(
        "[FILE_VERSION]:[1]
[ANALYSIS_DOMAIN]:[TIME+FREQUENCY]
\t[MAX_ITERATIONS]:[15] [COMPLEX_MOD]:[SHAKE_FI] [EFFECTIVE_SSR]:[0.65]
[ANALYSIS_TYPE]:[NONLINEAR]
[SHEAR_TYPE]:[VELOCITY]
[MAX_ITERATIONS]:[5]
[ERROR_TOL]:[1E-05]
[STEP_CONTROL]:[FLEXIBLE] [MAX_STRAIN_INC]:[0] [INTERPOLATION]:[LINEAR]
[VISCOUS_DAMPING]:[FREQUENCY_INDEPENDENT]
[DAMPING_UPDATE]:[FALSE]
",
    );
    text.push_str(&format!("[NUM_LAYERS]:[{}]\n", layers.len()));
    text.push_str("[WATER_TABLE]:[1]\n");

    for (index, layer) in layers.iter().enumerate() {
        text.push_str(&format!("[LAYER]:[{}]\n", index + 1));
        text.push_str(&format!(
            "\t[THICKNESS]:[{}] [WEIGHT]:[{}] [SHEAR]:[180] [SS_DAMP]:[0.02]\n",
            layer.thickness, layer.weight
        ));
        text.push_str(&format!(
            "\t[MODEL]:[GQ] [STRENGTH]:[{}] [THETA1]:[-4.2] [THETA2]:[-3.1]\n",
            layer.strength
        ));
        text.push_str("\t[MRDF]:[UIUC] [P1]:[0.82] [P2]:[0.55] [P3]:[20]\n");
        text.push_str("\t[OUTPUT]:[TRUE]\n");
    }

    text.push_str(ROCK_BLOCK);
    text
}

pub(crate) const ROCK_BLOCK: &str = "[LAYER]:[TOP_OF_ROCK]
\t[OUTPUT]:[TRUE]
[HALFSPACE]:[ELASTIC] [UNIT_WEIGHT]:[22] [SHEAR]:[760] [DAMPING]:[0.02]
[RS_TYPE]:[FREQUENCY_DOMAIN]
[NUMBER_OF_MOTIONS]:[1]
[MOTION]:[motion.txt]
";

pub(crate) fn record(entry: &str, text: &str) -> ProfileRecord {
    let name = RecordName::parse(entry).expect("fixture record name should parse");
    ProfileRecord::new(name, text.lines().map(str::to_string).collect())
}

pub(crate) const PARAMETER_TABLE: &str = "PWP model inputs for site A
Rows below the header list one soil layer each
Model codes: sand-Vucetic-Dobry sand-Green-Mitchell-Polito sand-Park-Ahn sand-Berrill-Davis clay-Matasovic
Dissipation: RU CV CV_EXPONENT
,,,,,,,,,,,,,,,,,,,,,,
Layer,PWP_MODEL,RU,CV,CV_EXPONENT,PWP_F1,PWP_P,PWP_F2,PWP_S,PWP_G,PWP_V,PWP_R,PWP_A,PWP_B,PWP_C,PWP_D,PEC,PA_ALPHA,PA_BETA,PA_DTH,BD_ALPHA,BD_BETA,\"Notes
(free text)\",
1,sand-Vucetic-Dobry,0.95,0.1,0,1,1,0.73,1,0.02,3.8,,,,,,,,,,,,loose sand,
2,S_BD,0.9,0.2,0,,,,,,,,,,,,,,,,2.3,0.46,,
3,clay-Matasovic,0.85,0.05,0,,,,0.1,0.03,,0.9,7.6,-14.3,7.1,1,,,,,,,soft clay,
";
