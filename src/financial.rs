/// annuity payment per period.
///
/// `pv` follows spreadsheet sign conventions: a loan received is passed as a
/// negative present value and yields a positive payment. With a zero rate the
/// payment degenerates to an even split of `pv + fv`.
pub fn pmt(rate: f64, nper: f64, pv: f64, fv: f64, pay_at_period_start: bool) -> f64 {
    if rate == 0.0 {
        return -(fv + pv) / nper;
    }
    let r1 = rate + 1.0;
    let growth = r1.powf(nper);
    let timing = if pay_at_period_start { r1 } else { 1.0 };
    (fv + pv * growth) * rate / (timing * (1.0 - growth))
}
