/// Avogadro constant, 1/mol.
pub const AVOGADRO: f64 = 6.022_140_9e23;
/// Atomic mass unit in kilograms.
pub const AMU_TO_KG: f64 = 1.660_548_782e-27;

/// Areal density in ug/cm2 of a foil layer given its thickness in nm and
/// density in g/cm3.
pub fn areal_density(thickness_nm: f64, density_g_per_cm3: f64) -> f64 {
    thickness_nm * density_g_per_cm3 * AVOGADRO * AMU_TO_KG * 100.0
}

/// Flight length between the outermost timing foils, scaled by 1/1000.
pub fn time_of_flight_length(first_distance: f64, last_distance: f64) -> f64 {
    (last_distance - first_distance) / 1000.0
}
